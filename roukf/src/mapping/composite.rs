//! Composite mapper for heterogeneous parameter vectors.
//!
//! Consecutive blocks of parameters are handled by their own mapper, e.g.
//! two unconstrained rates followed by one positive variance.

use nalgebra::RealField;

use super::ParameterMapper;

/// Concatenation of mappers over consecutive parameter blocks.
#[derive(Debug, Default)]
pub struct CompositeMapper<T: RealField + Copy> {
    blocks: Vec<(usize, Box<dyn ParameterMapper<T>>)>,
}

impl<T: RealField + Copy> CompositeMapper<T> {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Append a block of `count` parameters handled by `mapper`.
    pub fn with_block(mut self, count: usize, mapper: impl ParameterMapper<T> + 'static) -> Self {
        self.push_block(count, Box::new(mapper));
        self
    }

    pub fn push_block(&mut self, count: usize, mapper: Box<dyn ParameterMapper<T>>) {
        self.blocks.push((count, mapper));
    }

    /// Total number of parameters covered by the blocks.
    pub fn len(&self) -> usize {
        self.blocks.iter().map(|(count, _)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn for_each_block(&self, values: &mut [T], apply: impl Fn(&dyn ParameterMapper<T>, &mut [T])) {
        let mut rest = values;
        for (count, mapper) in &self.blocks {
            let take = (*count).min(rest.len());
            let (head, tail) = core::mem::take(&mut rest).split_at_mut(take);
            apply(mapper.as_ref(), head);
            rest = tail;
        }
    }
}

impl<T: RealField + Copy> ParameterMapper<T> for CompositeMapper<T> {
    fn to_filter_space(&self, values: &mut [T]) {
        self.for_each_block(values, |m, block| m.to_filter_space(block));
    }

    fn to_problem_space(&self, values: &mut [T]) {
        self.for_each_block(values, |m, block| m.to_problem_space(block));
    }

    fn arity(&self) -> Option<usize> {
        Some(self.len())
    }
}
