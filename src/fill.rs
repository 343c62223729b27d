//! 水位渲染：按饮水量在空瓶上叠加一层被遮罩裁剪的蓝色水柱

use image::{Rgba, RgbaImage};

use crate::silhouette::BottleAssets;

/// 半透明蓝色水柱
pub const FILL_COLOR: Rgba<u8> = Rgba([0, 0, 255, 200]);

/// 填充比例 min(1, total / capacity)，容量为 0 视为已满
pub fn fill_ratio(total_ml: u64, capacity_ml: u64) -> f32 {
    if capacity_ml == 0 {
        return 1.0;
    }
    (total_ml as f64 / capacity_ml as f64).min(1.0) as f32
}

/// 水柱高度 floor(height * ratio)
pub fn fill_height(height: u32, ratio: f32) -> u32 {
    let ratio = ratio.clamp(0.0, 1.0) as f64;
    ((height as f64 * ratio).floor() as u32).min(height)
}

/// 只含水柱的图层：底部 fill_height 行涂色，alpha 再乘以遮罩
pub fn fill_layer(assets: &BottleAssets, total_ml: u64, capacity_ml: u64) -> RgbaImage {
    let (w, h) = assets.mask.dimensions();
    let top = h - fill_height(h, fill_ratio(total_ml, capacity_ml));
    RgbaImage::from_fn(w, h, |x, y| {
        if y < top {
            return Rgba([0, 0, 0, 0]);
        }
        let m = assets.mask.get_pixel(x, y)[0] as u16;
        let alpha = (FILL_COLOR[3] as u16 * m / 255) as u8;
        if alpha == 0 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([FILL_COLOR[0], FILL_COLOR[1], FILL_COLOR[2], alpha])
        }
    })
}

/// 非预乘 alpha 的 over 合成，整数运算：底色不透明时结果一定不透明
pub fn over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as u32;
    if sa == 0 {
        return dst;
    }
    let da = dst[3] as u32;
    // da * (255 - sa) / 255，取整到最近
    let under = (da * (255 - sa) + 127) / 255;
    let out_a = sa + under;
    if out_a == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |i: usize| {
        let num = src[i] as u32 * sa + dst[i] as u32 * under;
        ((num + out_a / 2) / out_a).min(255) as u8
    };
    Rgba([channel(0), channel(1), channel(2), out_a as u8])
}

/// 空瓶在下、水柱在上做 over 合成，得到显示用图像
pub fn render(assets: &BottleAssets, total_ml: u64, capacity_ml: u64) -> RgbaImage {
    let mut out = assets.empty_sprite.clone();
    let layer = fill_layer(assets, total_ml, capacity_ml);
    for (d, s) in out.pixels_mut().zip(layer.pixels()) {
        *d = over(*d, *s);
    }
    out
}
