//! Minimal subset of the ONNX protobuf schema.
//!
//! Only the messages needed to read a graph's declared inputs and outputs are
//! described. Field tags match `onnx.proto`; everything else in a model
//! (nodes, initializers, opsets) is skipped by the decoder. The `oneof`
//! members used here (`TypeProto.tensor_type`, `Dimension.dim_value` /
//! `dim_param`) are wire-compatible with plain fields.

use prost::Message;

#[derive(Clone, PartialEq, Message)]
pub struct ModelProto {
    #[prost(int64, tag = "1")]
    pub ir_version: i64,
    #[prost(string, tag = "2")]
    pub producer_name: String,
    #[prost(message, optional, tag = "7")]
    pub graph: Option<GraphProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct GraphProto {
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(message, repeated, tag = "11")]
    pub input: Vec<ValueInfoProto>,
    #[prost(message, repeated, tag = "12")]
    pub output: Vec<ValueInfoProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ValueInfoProto {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub r#type: Option<TypeProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TypeProto {
    #[prost(message, optional, tag = "1")]
    pub tensor_type: Option<type_proto::Tensor>,
}

pub mod type_proto {
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Tensor {
        #[prost(int32, tag = "1")]
        pub elem_type: i32,
        #[prost(message, optional, tag = "2")]
        pub shape: Option<super::TensorShapeProto>,
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct TensorShapeProto {
    #[prost(message, repeated, tag = "1")]
    pub dim: Vec<tensor_shape_proto::Dimension>,
}

pub mod tensor_shape_proto {
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Dimension {
        #[prost(int64, tag = "1")]
        pub dim_value: i64,
        #[prost(string, tag = "2")]
        pub dim_param: String,
    }
}

impl ValueInfoProto {
    /// A tensor-typed value. Negative dims become symbolic (`dim_param`).
    pub fn tensor(name: &str, elem_type: i32, dims: &[i64]) -> Self {
        let dim = dims
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                if d < 0 {
                    tensor_shape_proto::Dimension {
                        dim_value: 0,
                        dim_param: format!("d{i}"),
                    }
                } else {
                    tensor_shape_proto::Dimension {
                        dim_value: d,
                        dim_param: String::new(),
                    }
                }
            })
            .collect();
        ValueInfoProto {
            name: name.to_string(),
            r#type: Some(TypeProto {
                tensor_type: Some(type_proto::Tensor {
                    elem_type,
                    shape: Some(TensorShapeProto { dim }),
                }),
            }),
        }
    }
}

impl ModelProto {
    /// A model whose graph declares only `inputs` and `outputs`.
    pub fn with_io(inputs: Vec<ValueInfoProto>, outputs: Vec<ValueInfoProto>) -> Self {
        ModelProto {
            ir_version: 8,
            producer_name: "conversion-block".to_string(),
            graph: Some(GraphProto {
                name: "main".to_string(),
                input: inputs,
                output: outputs,
            }),
        }
    }
}
