//! Seam between the planner and whatever actually solves the model.

use crate::error::SolverError;
use crate::model::ModelInstance;
use crate::stream::SolutionStream;
use crate::template::ModelTemplate;

/// A backend able to solve a model instance against a problem template.
///
/// `submit` returns once the request is accepted; results arrive through
/// the stream. An infeasible model is reported as a status on the stream,
/// never as an `Err`.
pub trait ConstraintSolver {
    fn submit(
        &self,
        template: &ModelTemplate,
        instance: &ModelInstance,
    ) -> Result<SolutionStream, SolverError>;
}

impl<S: ConstraintSolver + ?Sized> ConstraintSolver for &S {
    fn submit(
        &self,
        template: &ModelTemplate,
        instance: &ModelInstance,
    ) -> Result<SolutionStream, SolverError> {
        (**self).submit(template, instance)
    }
}
