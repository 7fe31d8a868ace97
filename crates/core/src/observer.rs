//! Progress hooks for iterative algorithms.
//!
//! The solvers in `fnspace-solvers` emit one event per update, carrying the
//! iteration counter, a view of the current iterate and its residual norm.
//! The observer sees each event before the next update and can answer with
//! a solver-defined action. Both Landweber and CGN define a single action,
//! `StopEarly`, which keeps the current iterate and reports
//! `Status::StoppedByObserver`.

/// Watches the events of an iteration and optionally answers with an action.
///
/// Returning `None` leaves the iteration alone. Every `FnMut(&E) -> Option<A>`
/// closure is an observer, which is how residual histories are usually
/// recorded. The unit type is the observer behind the `solve_unobserved`
/// entry points and never answers.
///
/// # Example
///
/// Halving a residual until an observer asks to stop:
///
/// ```
/// use fnspace_core::Observer;
///
/// #[derive(Debug, PartialEq)]
/// enum Action {
///     StopEarly,
/// }
///
/// fn halve(
///     mut residual: f64,
///     iterations: usize,
///     mut observer: impl Observer<f64, Action>,
/// ) -> f64 {
///     for _ in 0..iterations {
///         residual /= 2.0;
///         if let Some(Action::StopEarly) = observer.observe(&residual) {
///             break;
///         }
///     }
///     residual
/// }
///
/// assert_eq!(halve(1.0, 4, ()), 0.0625);
/// assert_eq!(halve(1.0, 4, |r: &f64| (*r < 0.3).then_some(Action::StopEarly)), 0.25);
/// ```
pub trait Observer<E, A> {
    /// Receives one event and returns the action to take, if any.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}
