pub trait Optimizer {
    /// Updates `params` in place with the given gradient.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]);

    /// Replaces the step length used by the next updates.
    fn set_learning_rate(&mut self, learning_rate: f32);
}
