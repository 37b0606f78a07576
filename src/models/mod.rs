//! ML model loading and inference components

pub mod classifier;
pub mod handle;
pub mod inference;
pub mod loader;
pub mod onnx;

pub use classifier::{Classifier, LogisticClassifier, RawPrediction};
pub use handle::{ModelHandle, ReadyModel};
pub use inference::InferenceEngine;
pub use loader::ModelLoader;
