//! Tensor API.
//!
//! Tensors are the inputs and outputs of neural networks. Here, they carry image data into the
//! hand networks and bounding boxes, scores, and landmarks out of them.

use std::fmt;

use anyhow::Context;

/// An N-dimensional array of `f32`s, stored in row-major order.
#[derive(Clone)]
pub struct Tensor {
    shape: Box<[usize]>,
    data: Box<[f32]>,
}

impl Tensor {
    /// Creates an `N`-dimensional tensor of the given shape by calling `f` for each element.
    ///
    /// `f` is invoked with successive indices, starting at `[0, ..., 0, 0]`, then
    /// `[0, ..., 0, 1]` and so on.
    pub fn from_array_shape_fn<const N: usize, F: FnMut([usize; N]) -> f32>(
        shape: [usize; N],
        mut f: F,
    ) -> Self {
        let len = shape.iter().product();
        let mut data = Vec::with_capacity(len);
        let mut index = [0; N];
        for _ in 0..len {
            data.push(f(index));

            // Increment the index, innermost dimension first.
            for (i, size) in index.iter_mut().zip(shape).rev() {
                *i += 1;
                if *i < size {
                    break;
                }
                *i = 0;
            }
        }

        Self {
            shape: shape.into(),
            data: data.into_boxed_slice(),
        }
    }

    /// Creates a tensor of the given shape by pulling elements from an iterator.
    ///
    /// # Panics
    ///
    /// `iter` must yield exactly as many elements as specified by `shape` (by multiplying all of
    /// its entries), otherwise this method will panic.
    pub fn from_iter<I: IntoIterator<Item = f32>>(shape: &[usize], iter: I) -> Self {
        let data: Box<[f32]> = iter.into_iter().collect();
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "element count does not match shape {shape:?}"
        );
        Self {
            shape: shape.into(),
            data,
        }
    }

    pub(super) fn from_tract(tract: &tract_onnx::prelude::Tensor) -> anyhow::Result<Self> {
        let data = tract
            .as_slice::<f32>()
            .context("network produced a non-f32 output tensor")?;
        Ok(Self {
            shape: tract.shape().into(),
            data: data.into(),
        })
    }

    pub(super) fn to_tract(&self) -> anyhow::Result<tract_onnx::prelude::Tensor> {
        Ok(tract_onnx::prelude::Tensor::from_shape(
            &self.shape,
            &self.data,
        )?)
    }

    /// Returns the shape of this tensor.
    ///
    /// A tensor's shape is the number of entries in each dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Indexes a prefix of the tensor's dimensions, returning the elements of the selected
    /// sub-tensor as a flat slice.
    ///
    /// For a tensor of shape `[1, 2016, 18]`, `index([0, 5])` returns the 18 values of row 5.
    ///
    /// # Panics
    ///
    /// This method will panic if `indices` has more entries than `self` has dimensions, or if any
    /// index is out of bounds.
    #[track_caller]
    pub fn index<const N: usize>(&self, indices: [usize; N]) -> &[f32] {
        assert!(
            N <= self.rank(),
            "attempted to index tensor of shape {:?} with {:?}",
            self.shape(),
            indices
        );

        let mut data = &*self.data;
        for (dim, index) in indices.into_iter().enumerate() {
            assert!(
                index < self.shape[dim],
                "attempted to index tensor of shape {:?} with {:?}",
                self.shape(),
                indices
            );
            let stride: usize = self.shape[dim + 1..].iter().product();
            data = &data[index * stride..(index + 1) * stride];
        }
        data
    }

    /// Returns all elements of the tensor as a flat slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor {:?}", self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_fn_visits_in_row_major_order() {
        let mut visited = Vec::new();
        let tensor = Tensor::from_array_shape_fn([2, 3], |[y, x]| {
            visited.push([y, x]);
            (y * 10 + x) as f32
        });
        assert_eq!(tensor.shape(), &[2, 3]);
        assert_eq!(tensor.as_slice(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(visited.first(), Some(&[0, 0]));
        assert_eq!(visited.last(), Some(&[1, 2]));
    }

    #[test]
    fn index_prefix() {
        let tensor = Tensor::from_iter(&[1, 3, 2], (0..6).map(|i| i as f32));
        assert_eq!(tensor.index([0]).len(), 6);
        assert_eq!(tensor.index([0, 1]), &[2.0, 3.0]);
        assert_eq!(tensor.index([0, 2, 1]), &[5.0]);
    }

    #[test]
    #[should_panic]
    fn index_out_of_bounds() {
        let tensor = Tensor::from_iter(&[1, 3], [0.0; 3]);
        tensor.index([0, 3]);
    }

    #[test]
    fn tract_roundtrip() {
        let tensor = Tensor::from_iter(&[2, 2], [1.0, 2.0, 3.0, 4.0]);
        let tract = tensor.to_tract().unwrap();
        let back = Tensor::from_tract(&tract).unwrap();
        assert_eq!(back.shape(), &[2, 2]);
        assert_eq!(back.as_slice(), tensor.as_slice());
    }
}
