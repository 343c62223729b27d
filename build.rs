//! 构建时生成水滴形图标并嵌入 Windows 可执行文件

#[cfg(windows)]
const DROP_RGB: [u8; 3] = [30, 144, 255];

/// 水滴：下半部是圆，上半部从圆的水平直径收成一个尖
#[cfg(windows)]
fn inside_drop(size: u32, x: u32, y: u32) -> bool {
    let s = size as f32;
    let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
    let (cx, cy, r) = (s * 0.5, s * 0.62, s * 0.34);
    let tip = s * 0.06;

    if py >= cy {
        return (px - cx).powi(2) + (py - cy).powi(2) <= r * r;
    }
    if py < tip {
        return false;
    }
    let half_width = r * (py - tip) / (cy - tip);
    (px - cx).abs() <= half_width
}

#[cfg(windows)]
fn drop_icon(size: u32) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            if inside_drop(size, x, y) {
                rgba.extend_from_slice(&[DROP_RGB[0], DROP_RGB[1], DROP_RGB[2], 255]);
            } else {
                rgba.extend_from_slice(&[0, 0, 0, 0]);
            }
        }
    }
    rgba
}

#[cfg(windows)]
fn embed_icon() -> std::io::Result<()> {
    let out_dir = std::path::PathBuf::from(
        std::env::var_os("OUT_DIR").ok_or_else(|| std::io::Error::other("OUT_DIR not set"))?,
    );
    let icon_path = out_dir.join("water-tracker.ico");

    let mut icon_dir = ico::IconDir::new(ico::ResourceType::Icon);
    for size in [16u32, 32, 48, 256] {
        let image = ico::IconImage::from_rgba_data(size, size, drop_icon(size));
        icon_dir.add_entry(ico::IconDirEntry::encode(&image)?);
    }
    icon_dir.write(std::fs::File::create(&icon_path)?)?;

    let mut res = winres::WindowsResource::new();
    res.set_icon(&icon_path.to_string_lossy());
    res.compile()
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    #[cfg(windows)]
    {
        if let Err(e) = embed_icon() {
            println!("cargo:warning=no embedded icon: {e}");
        }
    }
}
