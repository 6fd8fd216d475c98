//! Fixed-shape matrices carried on streams.

use std::ops::{Index, IndexMut};
use std::slice;

use itertools::iproduct;
use static_assertions::assert_impl_all;

use crate::*;

/// A `rows` x `cols` matrix stored in raster order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    elements: Vec<T>,
}

assert_impl_all!(Matrix<i64>: Send, Sync, Signal);

impl<T> Matrix<T> {
    /// Creates a matrix from its elements in raster order.
    ///
    /// # Panics
    ///
    /// Panics if `elements` does not hold exactly `rows * cols` values.
    pub fn from_vec(rows: usize, cols: usize, elements: Vec<T>) -> Self {
        assert_eq!(elements.len(), rows * cols, "{}x{} matrix needs {} elements", rows, cols, rows * cols);
        Self { rows, cols, elements }
    }

    /// Creates a matrix whose element at `(row, col)` is `f(row, col)`.
    pub fn from_fn<F: FnMut(usize, usize) -> T>(rows: usize, cols: usize, mut f: F) -> Self {
        let elements = iproduct!(0..rows, 0..cols).map(|(row, col)| f(row, col)).collect();
        Self { rows, cols, elements }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize { self.rows }

    /// Number of columns.
    pub fn cols(&self) -> usize { self.cols }

    /// Number of elements.
    pub fn len(&self) -> usize { self.elements.len() }

    /// Returns whether the matrix has no elements.
    pub fn is_empty(&self) -> bool { self.elements.is_empty() }

    /// Canonical raster index of `(row, col)`.
    pub fn raster_index(&self, row: usize, col: usize) -> usize { row * self.cols + col }

    /// Returns the element at `(row, col)`, if in range.
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.elements.get(self.raster_index(row, col))
        } else {
            None
        }
    }

    /// Iterates over all `(row, col)` indexes in raster order.
    pub fn indexes(&self) -> impl Iterator<Item = (usize, usize)> { iproduct!(0..self.rows, 0..self.cols) }

    /// Iterates over the elements in raster order.
    pub fn iter(&self) -> slice::Iter<'_, T> { self.elements.iter() }

    /// Elements in raster order.
    pub fn as_slice(&self) -> &[T] { &self.elements }

    /// Consumes the matrix and returns its elements in raster order.
    pub fn into_vec(self) -> Vec<T> { self.elements }

    /// Returns row `row`.
    pub fn row(&self, row: usize) -> &[T] { &self.elements[row * self.cols..(row + 1) * self.cols] }

    /// Maps every element.
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Matrix<U> {
        Matrix { rows: self.rows, cols: self.cols, elements: self.elements.iter().map(f).collect() }
    }

    /// Name of the data port of element `(row, col)`.
    pub fn port_name(row: usize, col: usize) -> String { format!("data_{}_{}", row, col) }
}

impl<T: Clone> Matrix<T> {
    /// Creates a matrix filled with `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self { Self { rows, cols, elements: vec![value; rows * cols] } }

    /// Creates a matrix from a list of equally long rows.
    ///
    /// # Panics
    ///
    /// Panics if the rows differ in length.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Self {
        let cols = rows.first().map_or(0, |row| row.as_ref().len());
        let mut elements = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            assert_eq!(row.as_ref().len(), cols, "rows of a matrix must have the same length");
            elements.extend_from_slice(row.as_ref());
        }
        Self { rows: rows.len(), cols, elements }
    }

    /// Returns the matrix rotated by 180 degrees.
    pub fn rotated(&self) -> Self {
        Self { rows: self.rows, cols: self.cols, elements: self.elements.iter().rev().cloned().collect() }
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(row < self.rows && col < self.cols, "index ({}, {}) out of {}x{} matrix", row, col, self.rows, self.cols);
        &self.elements[row * self.cols + col]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(row < self.rows && col < self.cols, "index ({}, {}) out of {}x{} matrix", row, col, self.rows, self.cols);
        &mut self.elements[row * self.cols + col]
    }
}

impl<T: Signal> Signal for Matrix<T> {
    fn ports(&self, prefix: &str, ports: &mut Ports) {
        for ((row, col), elt) in self.indexes().zip(self.elements.iter()) {
            elt.ports(&port_name(prefix, &format!("{}_{}", row, col)), ports);
        }
    }
}

/// Height and width of an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ImageShape {
    /// Number of rows.
    pub height: usize,

    /// Number of pixels per row.
    pub width: usize,
}

impl ImageShape {
    /// Creates a new shape.
    pub const fn new(height: usize, width: usize) -> Self { Self { height, width } }

    /// Number of pixels.
    pub const fn n_pixels(&self) -> usize { self.height * self.width }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_order() {
        let matrix = Matrix::from_fn(2, 3, |row, col| (10 * row + col) as i64);
        assert_eq!(matrix.as_slice(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(matrix[(1, 2)], 12);
        assert_eq!(matrix.raster_index(1, 0), 3);
        assert_eq!(matrix.get(2, 0), None);
        assert_eq!(matrix.row(1), &[10, 11, 12]);
        assert_eq!(matrix.rotated().as_slice(), &[12, 11, 10, 2, 1, 0]);
    }

    #[test]
    fn stream_port_names() {
        let matrix = Matrix::from_rows(&[[1i64, 2], [3, 4]]);
        let ports = Valid::beat(matrix, false).to_ports("out");
        assert_eq!(ports["out_data_1_0"], 3);
        assert_eq!(Matrix::<i64>::port_name(1, 0), "data_1_0");
        assert!(ports.contains_key(&port_name("out", &Matrix::<i64>::port_name(0, 1))));
    }
}
