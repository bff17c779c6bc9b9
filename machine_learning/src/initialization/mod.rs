mod chained;
mod constant;
mod param_gen;
mod random;

use std::{cell::RefCell, rc::Rc};

pub use chained::ChainedParamGen;
pub use constant::ConstParamGen;
pub use param_gen::ParamGen;
use rand::Rng;
pub use random::RandParamGen;
use serde::{Deserialize, Serialize};

use crate::{
    MlErr, Result,
    arch::params::{ParamKind, ParamLayout, ParamSpec},
};

/// How to fill a kind of parameter array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitSpec {
    Const { value: f32 },
    Uniform { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
    XavierUniform,
}

impl InitSpec {
    fn param_gen<'a, R: Rng + 'a>(
        self,
        rng: &Rc<RefCell<R>>,
        spec: &ParamSpec,
    ) -> Result<Box<dyn ParamGen + 'a>> {
        let (rng, limit) = (Rc::clone(rng), spec.len());

        let param_gen: Box<dyn ParamGen + 'a> = match self {
            InitSpec::Const { value } => Box::new(ConstParamGen::new(value, limit)),
            InitSpec::Uniform { low, high } => {
                Box::new(RandParamGen::uniform(rng, limit, low, high)?)
            }
            InitSpec::Normal { mean, std_dev } => {
                Box::new(RandParamGen::normal(rng, limit, mean, std_dev)?)
            }
            InitSpec::XavierUniform => {
                let (fan_in, fan_out) = spec.fans();
                Box::new(RandParamGen::xavier_uniform(rng, limit, fan_in, fan_out)?)
            }
        };

        Ok(param_gen)
    }
}

/// Generates the initial parameters of every array in `layout`.
///
/// # Arguments
/// * `layout` - The parameter arrays to fill.
/// * `weights` - The initializer for weight arrays.
/// * `biases` - The initializer for bias arrays.
/// * `rng` - The source of randomness shared by every array.
///
/// # Returns
/// The flat parameter buffer or an error if some distribution is invalid.
pub fn initialize<R: Rng>(
    layout: &ParamLayout,
    weights: InitSpec,
    biases: InitSpec,
    rng: R,
) -> Result<Vec<f32>> {
    let rng = Rc::new(RefCell::new(rng));

    let param_gens = layout
        .slots()
        .iter()
        .map(|slot| match slot.spec.kind {
            ParamKind::Weight => weights.param_gen(&rng, &slot.spec),
            ParamKind::Bias => biases.param_gen(&rng, &slot.spec),
        })
        .collect::<Result<Vec<_>>>()?;

    let params = ChainedParamGen::new(param_gens)
        .sample(layout.size())
        .unwrap_or_default();

    if params.len() != layout.size() {
        return Err(MlErr::SizeMismatch {
            what: "initial parameters",
            got: params.len(),
            expected: layout.size(),
        });
    }

    Ok(params)
}
