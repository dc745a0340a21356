//! ONNX model I/O inspection.
//!
//! Reads the declared inputs and outputs of an ONNX graph into
//! [`TensorDescriptor`]s. Dimensions that are unknown, symbolic, zero or
//! negative are normalized to 1 so the downstream runtime can size buffers.

pub mod proto;

use std::fmt;
use std::path::Path;

use prost::Message;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConversionError, Result};
use proto::{ModelProto, ValueInfoProto};

/// ONNX `TensorProto.DataType` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum DataType {
    Undefined,
    Float,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Int32,
    Int64,
    String,
    Bool,
    Float16,
    Double,
    Uint32,
    Uint64,
    Complex64,
    Complex128,
    Bfloat16,
    /// Codes this tool does not name; preserved as-is.
    Other(i32),
}

impl DataType {
    pub fn code(&self) -> i32 {
        match self {
            DataType::Undefined => 0,
            DataType::Float => 1,
            DataType::Uint8 => 2,
            DataType::Int8 => 3,
            DataType::Uint16 => 4,
            DataType::Int16 => 5,
            DataType::Int32 => 6,
            DataType::Int64 => 7,
            DataType::String => 8,
            DataType::Bool => 9,
            DataType::Float16 => 10,
            DataType::Double => 11,
            DataType::Uint32 => 12,
            DataType::Uint64 => 13,
            DataType::Complex64 => 14,
            DataType::Complex128 => 15,
            DataType::Bfloat16 => 16,
            DataType::Other(code) => *code,
        }
    }

    /// ONNX spelling of the type, e.g. `FLOAT`.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Undefined => "UNDEFINED",
            DataType::Float => "FLOAT",
            DataType::Uint8 => "UINT8",
            DataType::Int8 => "INT8",
            DataType::Uint16 => "UINT16",
            DataType::Int16 => "INT16",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::String => "STRING",
            DataType::Bool => "BOOL",
            DataType::Float16 => "FLOAT16",
            DataType::Double => "DOUBLE",
            DataType::Uint32 => "UINT32",
            DataType::Uint64 => "UINT64",
            DataType::Complex64 => "COMPLEX64",
            DataType::Complex128 => "COMPLEX128",
            DataType::Bfloat16 => "BFLOAT16",
            DataType::Other(_) => "OTHER",
        }
    }
}

impl From<i32> for DataType {
    fn from(code: i32) -> Self {
        match code {
            0 => DataType::Undefined,
            1 => DataType::Float,
            2 => DataType::Uint8,
            3 => DataType::Int8,
            4 => DataType::Uint16,
            5 => DataType::Int16,
            6 => DataType::Int32,
            7 => DataType::Int64,
            8 => DataType::String,
            9 => DataType::Bool,
            10 => DataType::Float16,
            11 => DataType::Double,
            12 => DataType::Uint32,
            13 => DataType::Uint64,
            14 => DataType::Complex64,
            15 => DataType::Complex128,
            16 => DataType::Bfloat16,
            other => DataType::Other(other),
        }
    }
}

impl From<DataType> for i32 {
    fn from(dtype: DataType) -> Self {
        dtype.code()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Other(code) => write!(f, "OTHER({code})"),
            named => f.write_str(named.name()),
        }
    }
}

/// A named tensor with a concrete shape, as serialized into `chain.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TensorDescriptor {
    pub name: String,
    pub shape: Vec<u64>,
    pub data_type: DataType,
}

impl TensorDescriptor {
    pub fn new(name: impl Into<String>, shape: Vec<u64>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            shape,
            data_type,
        }
    }

    fn from_value_info(value: &ValueInfoProto) -> Self {
        let tensor = value.r#type.as_ref().and_then(|t| t.tensor_type.as_ref());
        let shape = tensor
            .and_then(|t| t.shape.as_ref())
            .map(|s| s.dim.iter().map(|d| normalize_dim(d.dim_value)).collect())
            .unwrap_or_default();
        let data_type = tensor.map(|t| DataType::from(t.elem_type)).unwrap_or(DataType::Undefined);
        Self::new(value.name.clone(), shape, data_type)
    }
}

/// Unknown or non-positive dimensions become 1.
pub fn normalize_dim(dim_value: i64) -> u64 {
    if dim_value > 0 {
        dim_value as u64
    } else {
        1
    }
}

/// Declared inputs and outputs of one model file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IoInfo {
    pub inputs: Vec<TensorDescriptor>,
    pub outputs: Vec<TensorDescriptor>,
}

impl IoInfo {
    /// The I/O of a model that does not exist.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|t| t.name.clone()).collect()
    }

    pub fn find_input(&self, name: &str) -> Option<&TensorDescriptor> {
        self.inputs.iter().find(|t| t.name == name)
    }

    pub fn find_output(&self, name: &str) -> Option<&TensorDescriptor> {
        self.outputs.iter().find(|t| t.name == name)
    }

    /// Extract the I/O declarations of a decoded model.
    pub fn from_model(model: &ModelProto) -> Option<Self> {
        let graph = model.graph.as_ref()?;
        Some(Self {
            inputs: graph.input.iter().map(TensorDescriptor::from_value_info).collect(),
            outputs: graph.output.iter().map(TensorDescriptor::from_value_info).collect(),
        })
    }
}

/// Decode an ONNX model from bytes and return its I/O declarations.
pub fn decode_io_info(bytes: &[u8], path: &Path) -> Result<IoInfo> {
    let model = ModelProto::decode(bytes).map_err(|e| ConversionError::ModelLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    IoInfo::from_model(&model).ok_or_else(|| ConversionError::ModelLoad {
        path: path.to_path_buf(),
        reason: "model has no graph".to_string(),
    })
}

/// Read the I/O declarations of the ONNX model at `path`.
pub fn read_io_info(path: &Path) -> Result<IoInfo> {
    let bytes = std::fs::read(path).map_err(|e| ConversionError::ModelLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let info = decode_io_info(&bytes, path)?;
    debug!(
        model = %path.display(),
        inputs = info.inputs.len(),
        outputs = info.outputs.len(),
        "read model I/O"
    );
    Ok(info)
}

/// Like [`read_io_info`], but an absent model yields [`IoInfo::empty`].
pub fn read_optional_io_info(path: Option<&Path>) -> Result<IoInfo> {
    match path {
        Some(path) => read_io_info(path),
        None => Ok(IoInfo::empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto::{GraphProto, TypeProto};

    fn encode(inputs: Vec<ValueInfoProto>, outputs: Vec<ValueInfoProto>) -> Vec<u8> {
        ModelProto::with_io(inputs, outputs).encode_to_vec()
    }

    #[test]
    fn test_io_info_preserves_count_and_order() {
        let bytes = encode(
            vec![
                ValueInfoProto::tensor("images", 1, &[1, 3, 224, 224]),
                ValueInfoProto::tensor("mask", 9, &[1, 224, 224]),
                ValueInfoProto::tensor("scale", 11, &[1]),
            ],
            vec![
                ValueInfoProto::tensor("boxes", 1, &[1, 100, 4]),
                ValueInfoProto::tensor("scores", 1, &[1, 100]),
            ],
        );
        let info = decode_io_info(&bytes, Path::new("net.onnx")).unwrap();

        assert_eq!(info.input_names(), vec!["images", "mask", "scale"]);
        assert_eq!(
            info.outputs.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            vec!["boxes", "scores"]
        );
        assert_eq!(info.inputs[1].data_type, DataType::Bool);
        assert_eq!(info.inputs[2].data_type, DataType::Double);
        assert_eq!(info.inputs[0].shape, vec![1, 3, 224, 224]);
    }

    #[test]
    fn test_unknown_and_zero_dims_normalize_to_one() {
        let bytes = encode(vec![ValueInfoProto::tensor("x", 1, &[-1, 0, 3, 640])], vec![]);
        let info = decode_io_info(&bytes, Path::new("net.onnx")).unwrap();
        assert_eq!(info.inputs[0].shape, vec![1, 1, 3, 640]);
    }

    #[test]
    fn test_normalize_dim() {
        assert_eq!(normalize_dim(-7), 1);
        assert_eq!(normalize_dim(0), 1);
        assert_eq!(normalize_dim(1), 1);
        assert_eq!(normalize_dim(512), 512);
    }

    #[test]
    fn test_non_tensor_value_has_empty_shape_and_undefined_type() {
        let model = ModelProto {
            ir_version: 8,
            producer_name: String::new(),
            graph: Some(GraphProto {
                name: "g".to_string(),
                input: vec![ValueInfoProto {
                    name: "seq".to_string(),
                    r#type: Some(TypeProto { tensor_type: None }),
                }],
                output: vec![],
            }),
        };
        let info = IoInfo::from_model(&model).unwrap();
        assert!(info.inputs[0].shape.is_empty());
        assert_eq!(info.inputs[0].data_type, DataType::Undefined);
    }

    #[test]
    fn test_model_without_graph_is_model_load_error() {
        let bytes = ModelProto {
            ir_version: 8,
            producer_name: String::new(),
            graph: None,
        }
        .encode_to_vec();
        match decode_io_info(&bytes, Path::new("empty.onnx")) {
            Err(ConversionError::ModelLoad { reason, .. }) => assert!(reason.contains("no graph")),
            other => panic!("expected ModelLoad, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_bytes_are_model_load_error() {
        let result = decode_io_info(&[0xff, 0xff, 0xff, 0xff], Path::new("bad.onnx"));
        assert!(matches!(result, Err(ConversionError::ModelLoad { .. })));
    }

    #[test]
    fn test_missing_file_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_io_info(&dir.path().join("missing.onnx"));
        assert!(matches!(result, Err(ConversionError::ModelLoad { .. })));
    }

    #[test]
    fn test_read_optional_none_is_empty() {
        assert_eq!(read_optional_io_info(None).unwrap(), IoInfo::empty());
    }

    #[test]
    fn test_tensor_descriptor_json_shape() {
        let t = TensorDescriptor::new("x", vec![1, 3], DataType::Float);
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v, serde_json::json!({"Name": "x", "Shape": [1, 3], "DataType": 1}));

        let back: TensorDescriptor =
            serde_json::from_value(serde_json::json!({"Name": "q", "Shape": [2], "DataType": 42}))
                .unwrap();
        assert_eq!(back.data_type, DataType::Other(42));
    }

    #[test]
    fn test_data_type_display() {
        assert_eq!(DataType::Float16.to_string(), "FLOAT16");
        assert_eq!(DataType::Other(23).to_string(), "OTHER(23)");
    }
}
