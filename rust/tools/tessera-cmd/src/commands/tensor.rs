//! Tensor construction command implementation

use std::{str::FromStr, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tessera_tensor::{
    AllocatorConfig, ByteOrder, HeapBuffer, LocalEngine, Tensor, TensorAllocator, TensorElement,
    TensorType, shape::element_count,
};

use crate::utils;

/// Upper bound on the number of values generated when `--values` is omitted.
const MAX_DEFAULT_VALUES: usize = 1 << 20;

/// How the tensor data reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// Copy the values into a freshly allocated aligned buffer
    Copy,
    /// Fill an aligned buffer and hand it over without copying
    Buffer,
    /// Hand over a plain heap vector (rejected: not direct memory)
    Heap,
}

#[derive(Debug, Args)]
pub struct TensorArgs {
    /// Element type, e.g. `float`, `i64`, `DOUBLE_TENSOR`, `string`
    #[arg(short = 't', long = "type")]
    pub tensor_type: TensorType,

    /// Comma-separated shape; empty for a scalar
    #[arg(short, long, default_value = "")]
    pub dims: String,

    /// Comma-separated values; defaults to 0, 1, 2, ...
    #[arg(long)]
    pub values: Option<String>,

    #[arg(long, value_enum, default_value_t = Source::Copy)]
    pub source: Source,

    /// Alignment of allocated buffers (a power of two)
    #[arg(short, long, default_value_t = tessera_bytes::DEFAULT_ALIGNMENT)]
    pub alignment: usize,

    /// Reject tensors larger than this many bytes
    #[arg(long)]
    pub max_bytes: Option<usize>,

    /// Declare the buffer in non-native byte order (`--source buffer` only)
    #[arg(long)]
    pub non_native: bool,

    /// Freeze the buffer before handing it over (`--source buffer` only)
    #[arg(long)]
    pub read_only: bool,
}

#[derive(Debug, Serialize)]
pub struct TensorReport {
    pub handle: String,
    pub tensor_type: &'static str,
    pub tag: i32,
    pub dims: Vec<u64>,
    pub num_elements: usize,
    pub byte_len: Option<usize>,
    pub data_address: Option<String>,
    pub aligned: Option<bool>,
    pub engine_address: Option<String>,
    pub live_tensors: usize,
}

pub fn run(args: TensorArgs) -> Result<()> {
    let report = build(&args)?;
    utils::print_json(&report)
}

pub fn build(args: &TensorArgs) -> Result<TensorReport> {
    let dims = utils::parse_dims(&args.dims)?;
    let mut config = AllocatorConfig::default().with_alignment(args.alignment);
    if let Some(max) = args.max_bytes {
        config = config.with_max_tensor_bytes(max);
    }

    let engine = Arc::new(LocalEngine::new());
    let allocator = TensorAllocator::with_config(engine.clone(), config)
        .context("Failed to create tensor allocator")?;

    let tensor = match args.tensor_type {
        TensorType::String => {
            let values = match &args.values {
                Some(v) => v.split(',').map(str::to_string).collect::<Vec<_>>(),
                None => default_strings(&dims)?,
            };
            allocator.copy_from_strings(&values, &dims)?
        }
        TensorType::Int32 => build_numeric::<i32>(&allocator, args, &dims)?,
        TensorType::Int64 => build_numeric::<i64>(&allocator, args, &dims)?,
        TensorType::Float => build_numeric::<f32>(&allocator, args, &dims)?,
        TensorType::Double => build_numeric::<f64>(&allocator, args, &dims)?,
        other => {
            // The type is checked before the buffer, so an empty one is enough
            // to get the allocator's precondition error.
            allocator
                .tensor_from_memory(HeapBuffer::default(), &dims, other)
                .with_context(|| format!("Cannot build {other} from memory"))?
        }
    };

    let record = engine.tensor_record(tensor.handle());
    Ok(TensorReport {
        handle: tensor.handle().to_string(),
        tensor_type: tensor.tensor_type().name(),
        tag: tensor.tensor_type().value(),
        dims: tensor.dims().to_vec(),
        num_elements: tensor.num_elements(),
        byte_len: tensor.as_bytes().map(<[u8]>::len),
        data_address: tensor.data_address().map(utils::format_address),
        aligned: tensor.data_address().map(|a| a % args.alignment == 0),
        engine_address: record.map(|r| utils::format_address(r.address)),
        live_tensors: engine.live_tensors(),
    })
}

fn build_numeric<T>(allocator: &TensorAllocator, args: &TensorArgs, dims: &[u64]) -> Result<Tensor>
where
    T: TensorElement + FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let values = match &args.values {
        Some(v) => utils::parse_values::<T>(v)?,
        None => default_values::<T>(dims)?,
    };
    let tensor_type = T::TENSOR_TYPE;
    let tensor = match args.source {
        Source::Copy => allocator.copy_from(&values, dims)?,
        Source::Buffer => {
            let mut buffer = allocator.allocate_for(dims, tensor_type)?;
            buffer
                .write_typed(&values)
                .context("Values do not fit the shape")?;
            if args.non_native {
                buffer = buffer.with_order(ByteOrder::non_native());
            }
            if args.read_only {
                buffer = buffer.into_read_only();
            }
            allocator.tensor_from_memory(buffer, dims, tensor_type)?
        }
        Source::Heap => {
            allocator.tensor_from_memory(HeapBuffer::from_typed(&values), dims, tensor_type)?
        }
    };
    log::debug!("built {tensor:?}");
    Ok(tensor)
}

fn default_values<T>(dims: &[u64]) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let count = default_count(dims)?;
    (0..count)
        .map(|i| {
            i.to_string()
                .parse::<T>()
                .with_context(|| format!("Cannot represent {i}"))
        })
        .collect()
}

fn default_strings(dims: &[u64]) -> Result<Vec<String>> {
    let count = default_count(dims)?;
    Ok((0..count).map(|i| format!("s{i}")).collect())
}

fn default_count(dims: &[u64]) -> Result<usize> {
    let count = element_count(dims)?;
    if count > MAX_DEFAULT_VALUES {
        bail!("Refusing to generate {count} default values, pass --values instead");
    }
    Ok(count)
}
