//! 画像の前処理
//!
//! 224x224へのリサイズと [0, 1] への正規化を行います。
//! 画素順・チャネル順は学習時の前処理と一致している必要があります:
//! 行優先（y外側、x内側）、1画素ごとに R, G, B の順。

use image::{imageops::FilterType, RgbImage};

use crate::ml::ml_model::{INPUT_LEN, INPUT_SIZE};

/// モデル入力テンソル（HWC順、長さは常に `INPUT_LEN`）
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor(Vec<f32>);

impl InputTensor {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

/// 入力サイズにリサイズ（バイリニア相当）
pub fn resize_to_input(image: &RgbImage) -> RgbImage {
    image::imageops::resize(image, INPUT_SIZE as u32, INPUT_SIZE as u32, FilterType::Triangle)
}

/// 画素値を 0..=255 から 0.0..=1.0 に正規化
///
/// # 戻り値
/// - 正規化されたRGB画像データ (H, W, C) の順で平坦化
pub fn normalize_image(image: &RgbImage) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let mut data = Vec::with_capacity((width * height * 3) as usize);

    for y in 0..height {
        for x in 0..width {
            let pixel = image.get_pixel(x, y);
            data.push(pixel[0] as f32 / 255.0);
            data.push(pixel[1] as f32 / 255.0);
            data.push(pixel[2] as f32 / 255.0);
        }
    }

    data
}

/// リサイズと正規化をまとめて実行
pub fn preprocess(image: &RgbImage) -> InputTensor {
    let resized = resize_to_input(image);
    let data = normalize_image(&resized);
    debug_assert_eq!(data.len(), INPUT_LEN);
    InputTensor(data)
}
