use shared::CopperLabel;
use std::path::Path;
use tract_onnx::prelude::*;

/// Square input resolution the network was trained on.
pub const INPUT_SIZE: u32 = 224;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("failed to load model: {0}")]
    Load(String),
    #[error("image preprocessing failed: {0}")]
    Preprocessing(String),
    #[error("inference failed: {0}")]
    Execution(String),
    #[error("unsupported model output: {0} values")]
    UnsupportedOutput(usize),
}

/// One classifier verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: CopperLabel,
    /// Probability of the predicted class, in [0, 1].
    pub confidence: f64,
}

impl Prediction {
    /// Display percentage, rounded to 2 decimal places.
    pub fn percent(&self) -> f64 {
        (self.confidence * 100.0 * 100.0).round() / 100.0
    }
}

/// Anything that can classify a stored image file.
///
/// The production implementation wraps the ONNX artifact; tests substitute
/// fixed-output stubs through the same trait.
pub trait Classifier: Send + Sync {
    fn predict_path(&self, path: &Path) -> Result<Prediction, InferenceError>;
}

type RunnablePlan = TypedRunnableModel<TypedModel>;

/// CopperCNN artifact wrapper.
///
/// Loaded once at startup. The optimized plan is immutable and `run` keeps
/// per-call state internal, so one instance is shared across workers without
/// locking.
pub struct CopperModel {
    plan: RunnablePlan,
}

impl CopperModel {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let shape = [1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize];
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| InferenceError::Load(e.to_string()))?
            .with_input_fact(0, f32::fact(shape).into())
            .map_err(|e| InferenceError::Load(e.to_string()))?
            .into_optimized()
            .map_err(|e| InferenceError::Load(e.to_string()))?
            .into_runnable()
            .map_err(|e| InferenceError::Load(e.to_string()))?;
        Ok(CopperModel { plan })
    }

    pub fn predict_bytes(&self, data: &[u8]) -> Result<Prediction, InferenceError> {
        let input = image_to_tensor(data)?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Execution(e.to_string()))?;
        let scores = outputs[0]
            .as_slice::<f32>()
            .map_err(|e| InferenceError::Execution(e.to_string()))?;
        interpret_outputs(scores)
    }
}

impl Classifier for CopperModel {
    fn predict_path(&self, path: &Path) -> Result<Prediction, InferenceError> {
        let data =
            std::fs::read(path).map_err(|e| InferenceError::Preprocessing(e.to_string()))?;
        self.predict_bytes(&data)
    }
}

/// Decode, force RGB, resize to 224x224 and scale pixels to [0, 1], laid out
/// as an NCHW tensor.
pub fn image_to_tensor(data: &[u8]) -> Result<Tensor, InferenceError> {
    let rgb = image::load_from_memory(data)
        .map_err(|e| InferenceError::Preprocessing(e.to_string()))?
        .to_rgb8();
    let resized = image::imageops::resize(
        &rgb,
        INPUT_SIZE,
        INPUT_SIZE,
        image::imageops::FilterType::Triangle,
    );
    let tensor: Tensor = tract_ndarray::Array4::from_shape_fn(
        (1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize),
        |(_, c, y, x)| f32::from(resized[(x as u32, y as u32)][c]) / 255.0,
    )
    .into();
    Ok(tensor)
}

/// Maps raw head outputs to a labelled prediction.
///
/// Single sigmoid output: values above 0.5 mean "sin_cobre". The inversion
/// follows the training label ordering baked into the artifact; do not flip
/// it without re-verifying against that artifact. Two softmax outputs:
/// argmax, index 0 = "sin_cobre", index 1 = "con_cobre".
pub fn interpret_outputs(outputs: &[f32]) -> Result<Prediction, InferenceError> {
    match outputs {
        [score] => {
            let p = f64::from(*score);
            if p > 0.5 {
                Ok(Prediction {
                    label: CopperLabel::SinCobre,
                    confidence: p,
                })
            } else {
                Ok(Prediction {
                    label: CopperLabel::ConCobre,
                    confidence: 1.0 - p,
                })
            }
        }
        [sin_cobre, con_cobre] => {
            if con_cobre > sin_cobre {
                Ok(Prediction {
                    label: CopperLabel::ConCobre,
                    confidence: f64::from(*con_cobre),
                })
            } else {
                Ok(Prediction {
                    label: CopperLabel::SinCobre,
                    confidence: f64::from(*sin_cobre),
                })
            }
        }
        other => Err(InferenceError::UnsupportedOutput(other.len())),
    }
}
