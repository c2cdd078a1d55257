//! 分類モデルの共通定義
//!
//! 葉の写真を Healthy / Plague に分類する軽量CNNと関連する設定を提供します。

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{activation::softmax, backend::Backend, Tensor},
};

/// モデル入力サイズ（正方形）
pub const INPUT_SIZE: usize = 224;

/// 入力チャネル数 (RGB)
pub const INPUT_CHANNELS: usize = 3;

/// 入力テンソルの要素数 224 * 224 * 3
pub const INPUT_LEN: usize = INPUT_SIZE * INPUT_SIZE * INPUT_CHANNELS;

/// モデル設定
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// 分類クラス数
    pub num_classes: usize,
    /// 最初の畳み込み層のチャネル数
    #[config(default = 16)]
    pub base_filters: usize,
}

impl ModelConfig {
    /// モデルを初期化
    pub fn init<B: Backend>(&self, device: &B::Device) -> MiteClassifier<B> {
        let base = self.base_filters;

        MiteClassifier {
            // 224 -> 112 -> 56 -> 28 -> 14
            block1: ConvBlock::new(INPUT_CHANNELS, base, device),
            block2: ConvBlock::new(base, base * 2, device),
            block3: ConvBlock::new(base * 2, base * 4, device),
            block4: ConvBlock::new(base * 4, base * 8, device),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc: LinearConfig::new(base * 8, self.num_classes).init(device),
        }
    }
}

/// Conv 3x3 (same) + ReLU + MaxPool 2x2
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    pool: MaxPool2d,
    activation: Relu,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            activation: Relu::new(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.activation.forward(x);
        self.pool.forward(x)
    }
}

/// 葉画像分類用CNNモデル
///
/// # アーキテクチャ
/// - {Conv 3x3 + ReLU + MaxPool} x 4ブロック（チャネル数 b, 2b, 4b, 8b）
/// - Global Average Pooling
/// - FC: 8b -> num_classes
/// - Softmax (分類時)
#[derive(Module, Debug)]
pub struct MiteClassifier<B: Backend> {
    block1: ConvBlock<B>,
    block2: ConvBlock<B>,
    block3: ConvBlock<B>,
    block4: ConvBlock<B>,
    global_pool: AdaptiveAvgPool2d,
    fc: Linear<B>,
}

impl<B: Backend> MiteClassifier<B> {
    /// 順伝播
    ///
    /// # 引数
    /// - `images`: バッチ画像 [batch_size, 3, size, size]
    ///
    /// # 戻り値
    /// - クラスごとのロジット [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.block1.forward(images);
        let x = self.block2.forward(x);
        let x = self.block3.forward(x);
        let x = self.block4.forward(x);

        let x = self.global_pool.forward(x);
        let [_, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        self.fc.forward(x)
    }

    /// クラスごとの確信度（softmax済み）
    pub fn forward_scores(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }
}
