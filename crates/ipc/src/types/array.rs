//! Dense numeric arrays carried in scene payloads.

use crate::error::ValidationError;

/// Element type of an [`NdArray`], named the way the viewer names dtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Float32,
    Float64,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Bool,
    Str,
}

impl DType {
    /// Wire name of the element type
    pub fn name(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Bool => "bool",
            DType::Str => "str",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DType::Int32 | DType::Int64 | DType::UInt32 | DType::UInt64
        )
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Flat element storage of an [`NdArray`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::F32(v) => v.len(),
            ArrayData::F64(v) => v.len(),
            ArrayData::I32(v) => v.len(),
            ArrayData::I64(v) => v.len(),
            ArrayData::U32(v) => v.len(),
            ArrayData::U64(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
            ArrayData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::F32(_) => DType::Float32,
            ArrayData::F64(_) => DType::Float64,
            ArrayData::I32(_) => DType::Int32,
            ArrayData::I64(_) => DType::Int64,
            ArrayData::U32(_) => DType::UInt32,
            ArrayData::U64(_) => DType::UInt64,
            ArrayData::Bool(_) => DType::Bool,
            ArrayData::Str(_) => DType::Str,
        }
    }

    fn gather(&self, order: &[usize]) -> ArrayData {
        fn pick<T: Clone>(v: &[T], order: &[usize]) -> Vec<T> {
            order.iter().map(|&i| v[i].clone()).collect()
        }
        match self {
            ArrayData::F32(v) => ArrayData::F32(pick(v, order)),
            ArrayData::F64(v) => ArrayData::F64(pick(v, order)),
            ArrayData::I32(v) => ArrayData::I32(pick(v, order)),
            ArrayData::I64(v) => ArrayData::I64(pick(v, order)),
            ArrayData::U32(v) => ArrayData::U32(pick(v, order)),
            ArrayData::U64(v) => ArrayData::U64(pick(v, order)),
            ArrayData::Bool(v) => ArrayData::Bool(pick(v, order)),
            ArrayData::Str(v) => ArrayData::Str(pick(v, order)),
        }
    }
}

/// Memory order of the flat element storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// C order: the last index varies fastest
    #[default]
    RowMajor,
    /// Fortran order: the first index varies fastest
    ColumnMajor,
}

/// A dense n-dimensional array with a shape, flat data, and a memory layout.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: ArrayData,
    layout: Layout,
}

impl NdArray {
    /// Create a row-major array. The product of `shape` must equal the element count.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, ValidationError> {
        Self::with_layout(shape, data, Layout::RowMajor)
    }

    /// Create an array whose flat data is stored in the given layout
    pub fn with_layout(
        shape: Vec<usize>,
        data: ArrayData,
        layout: Layout,
    ) -> Result<Self, ValidationError> {
        let expected = shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d));
        if expected != Some(data.len()) {
            return Err(ValidationError::ShapeMismatch {
                shape,
                len: data.len(),
            });
        }
        Ok(Self {
            shape,
            data,
            layout,
        })
    }

    /// A one-dimensional array
    pub fn flat(data: ArrayData) -> Self {
        Self {
            shape: vec![data.len()],
            data,
            layout: Layout::RowMajor,
        }
    }

    /// An `n x 3` float array of points
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        Self {
            shape: vec![points.len(), 3],
            data: ArrayData::F32(points.iter().flatten().copied().collect()),
            layout: Layout::RowMajor,
        }
    }

    /// An `n x 2 x 3` float array of line segments
    pub fn from_segments(segments: &[[[f32; 3]; 2]]) -> Self {
        Self {
            shape: vec![segments.len(), 2, 3],
            data: ArrayData::F32(segments.iter().flatten().flatten().copied().collect()),
            layout: Layout::RowMajor,
        }
    }

    /// A flat index array of triangle corners
    pub fn from_indices(indices: Vec<u32>) -> Self {
        Self::flat(ArrayData::U32(indices))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy of this array with its data stored row-major
    pub fn to_row_major(&self) -> NdArray {
        match self.layout {
            Layout::RowMajor => self.clone(),
            Layout::ColumnMajor => NdArray {
                shape: self.shape.clone(),
                data: self.data.gather(&column_to_row_order(&self.shape)),
                layout: Layout::RowMajor,
            },
        }
    }

    /// Coerce a floating point array to `f32`, keeping shape and layout
    pub fn to_f32(&self) -> Option<NdArray> {
        let data = match &self.data {
            ArrayData::F32(v) => v.clone(),
            ArrayData::F64(v) => v.iter().map(|&x| x as f32).collect(),
            _ => return None,
        };
        Some(NdArray {
            shape: self.shape.clone(),
            data: ArrayData::F32(data),
            layout: self.layout,
        })
    }

    /// Row-major element values as `f64`, for any numeric element type
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        let row_major = self.to_row_major();
        let values = match row_major.data {
            ArrayData::F32(v) => v.into_iter().map(f64::from).collect(),
            ArrayData::F64(v) => v,
            ArrayData::I32(v) => v.into_iter().map(f64::from).collect(),
            ArrayData::I64(v) => v.into_iter().map(|x| x as f64).collect(),
            ArrayData::U32(v) => v.into_iter().map(f64::from).collect(),
            ArrayData::U64(v) => v.into_iter().map(|x| x as f64).collect(),
            ArrayData::Bool(_) | ArrayData::Str(_) => return None,
        };
        Some(values)
    }
}

/// For every row-major position, the offset of that element in column-major storage
fn column_to_row_order(shape: &[usize]) -> Vec<usize> {
    let len: usize = shape.iter().product();
    let mut col_strides = vec![1usize; shape.len()];
    for axis in 1..shape.len() {
        col_strides[axis] = col_strides[axis - 1] * shape[axis - 1];
    }

    (0..len)
        .map(|position| {
            let mut rest = position;
            let mut offset = 0;
            for axis in (0..shape.len()).rev() {
                let index = rest % shape[axis];
                rest /= shape[axis];
                offset += index * col_strides[axis];
            }
            offset
        })
        .collect()
}
