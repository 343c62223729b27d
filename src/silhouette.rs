//! 水瓶轮廓提取：源图 → 二值遮罩 + 灰色空瓶精灵图
//!
//! 流程：灰度 → 高斯模糊 → 阈值二值化 → 极性校正 → 生成空瓶图。
//! 结果在启动时计算一次，之后只读。

use std::path::Path;

use image::{DynamicImage, GrayImage, Rgba, RgbaImage, imageops};
use tracing::debug;

use crate::error::Result;

/// 遮罩中「瓶内」的取值
pub const BOTTLE: u8 = 255;
/// 遮罩中「背景」的取值
pub const BACKGROUND: u8 = 0;

/// 空瓶的平涂灰色
pub const SPRITE_GRAY: Rgba<u8> = Rgba([150, 150, 150, 255]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// 提取参数
#[derive(Clone, Debug)]
pub struct SilhouetteParams {
    /// 高斯模糊 sigma，<= 0 时跳过模糊
    pub blur_sigma: f32,
    /// 亮度严格大于该值记为 255
    pub threshold: u8,
}

impl Default for SilhouetteParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            threshold: 128,
        }
    }
}

/// 渲染所需的只读素材
#[derive(Clone, Debug)]
pub struct BottleAssets {
    pub mask: GrayImage,
    pub empty_sprite: RgbaImage,
}

impl BottleAssets {
    /// 从内存中的编码图片生成素材
    pub fn from_bytes(bytes: &[u8], params: &SilhouetteParams) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(extract(&img, params))
    }

    /// 从图片文件生成素材
    pub fn open(path: &Path, params: &SilhouetteParams) -> Result<Self> {
        let img = image::open(path)?;
        Ok(extract(&img, params))
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }
}

/// 由任意源图生成遮罩与空瓶图
pub fn extract(image: &DynamicImage, params: &SilhouetteParams) -> BottleAssets {
    let mut mask = binarize(&image.to_luma8(), params);
    let inverted = correct_polarity(&mut mask);
    let empty_sprite = sprite_from_mask(&mask);
    debug!(
        width = mask.width(),
        height = mask.height(),
        inverted,
        "bottle silhouette extracted"
    );
    BottleAssets { mask, empty_sprite }
}

fn binarize(luma: &GrayImage, params: &SilhouetteParams) -> GrayImage {
    let mut out = if params.blur_sigma > 0.0 {
        imageops::blur(luma, params.blur_sigma)
    } else {
        luma.clone()
    };
    for p in out.pixels_mut() {
        p[0] = if p[0] > params.threshold { BOTTLE } else { BACKGROUND };
    }
    out
}

/// 0 比 255 多时整体反相，返回是否反相。
///
/// 该启发式默认 255 一侧占多数；瓶子面积小于背景的源图会被标成背景。
fn correct_polarity(mask: &mut GrayImage) -> bool {
    let bottle = mask.pixels().filter(|p| p[0] == BOTTLE).count();
    let background = mask.pixels().filter(|p| p[0] == BACKGROUND).count();
    if background > bottle {
        imageops::invert(mask);
        true
    } else {
        false
    }
}

fn sprite_from_mask(mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y)[0] == BOTTLE {
            SPRITE_GRAY
        } else {
            TRANSPARENT
        }
    })
}
