//! `chain.json` descriptor builder.
//!
//! The chain tells the downstream runtime which models to run, in order:
//! the optional pre model, the DFP, and the optional post model. Only the
//! DFP stage carries `RuntimeArgs`, the tensor descriptors of its ports.

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::warn;

use crate::error::Result;
use crate::onnx::{IoInfo, TensorDescriptor};
use crate::ports::PortNames;

/// Tensor descriptors for the DFP's ports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuntimeArgs {
    pub inputs: Vec<TensorDescriptor>,
    pub outputs: Vec<TensorDescriptor>,
}

/// One entry of `chain.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChainStage {
    /// File name of the model inside the bundle.
    pub model_path: String,
    /// Runtime library; filled in by the runtime side, always empty here.
    pub runtime_path: String,
    pub input_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_args: Option<RuntimeArgs>,
}

/// Bundle file names of the models in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleNames {
    pub pre: Option<String>,
    pub dfp: String,
    pub post: Option<String>,
}

/// The chain plus the DFP port names that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    pub stages: Vec<ChainStage>,
    pub unresolved_inputs: Vec<String>,
    pub unresolved_outputs: Vec<String>,
}

impl ChainReport {
    pub fn has_unresolved(&self) -> bool {
        !self.unresolved_inputs.is_empty() || !self.unresolved_outputs.is_empty()
    }
}

/// Resolve each port name through `lookup`.
///
/// Returns the resolved descriptors in port order and the names found in neither.
fn resolve_ports<'a, F>(ports: &[String], lookup: F) -> (Vec<TensorDescriptor>, Vec<String>)
where
    F: Fn(&str) -> Option<&'a TensorDescriptor>,
{
    let mut resolved = Vec::with_capacity(ports.len());
    let mut unresolved = Vec::new();
    for port in ports {
        match lookup(port) {
            Some(descriptor) => resolved.push(descriptor.clone()),
            None => unresolved.push(port.clone()),
        }
    }
    (resolved, unresolved)
}

/// Build the chain for a converted model.
///
/// * DFP inputs resolve from `original` inputs, then `pre` outputs.
/// * DFP outputs resolve from `original` outputs, then `post` inputs.
/// * Unresolvable names are left out of `RuntimeArgs` and reported.
///
/// Pure: equal arguments always give an equal report.
pub fn build_chain(
    original: &IoInfo,
    pre: &IoInfo,
    post: &IoInfo,
    ports: &PortNames,
    names: &BundleNames,
) -> ChainReport {
    let (dfp_inputs, unresolved_inputs) = resolve_ports(&ports.inputs, |name| {
        original.find_input(name).or_else(|| pre.find_output(name))
    });
    let (dfp_outputs, unresolved_outputs) = resolve_ports(&ports.outputs, |name| {
        original.find_output(name).or_else(|| post.find_input(name))
    });

    for name in unresolved_inputs.iter().chain(&unresolved_outputs) {
        warn!(port = %name, "DFP port not declared by the model or its pre/post split");
    }

    let mut stages = Vec::with_capacity(3);
    if let Some(pre_name) = &names.pre {
        stages.push(ChainStage {
            model_path: pre_name.clone(),
            runtime_path: String::new(),
            input_names: pre.input_names(),
            runtime_args: None,
        });
    }

    stages.push(ChainStage {
        model_path: names.dfp.clone(),
        runtime_path: String::new(),
        input_names: ports.inputs.clone(),
        runtime_args: Some(RuntimeArgs {
            inputs: dfp_inputs,
            outputs: dfp_outputs,
        }),
    });

    if let Some(post_name) = &names.post {
        stages.push(ChainStage {
            model_path: post_name.clone(),
            runtime_path: String::new(),
            input_names: post.input_names(),
            runtime_args: None,
        });
    }

    ChainReport {
        stages,
        unresolved_inputs,
        unresolved_outputs,
    }
}

/// Render the chain as `chain.json` (three-space indent).
pub fn chain_to_json(stages: &[ChainStage]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"   ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    stages.serialize(&mut ser)?;
    Ok(buf)
}
