//! # Handlers
//!
//! Turns plain Rust closures into type-erased invocations over `Typed` values.
//!
//! Any `Fn(A1, .., An) -> R` with up to eight `Shaped` parameters and an
//! `IntoResults` return type is a `Handler`. Its parameter and result shapes are
//! known statically and read once at registration.

use dynrpc::CoercionError;
use dynrpc::IntoResults;
use dynrpc::Shape;
use dynrpc::Shaped;
use dynrpc::Typed;

/// A callable with statically known parameter and result shapes.
///
/// `Args` is the tuple of parameter types; it only exists to keep the impls for
/// different arities apart.
pub trait Handler<Args>: Send + Sync + 'static {
    fn params() -> Vec<Shape>;

    fn results() -> Vec<Shape>;

    /// Rebuilds each argument as its Rust type and runs the closure.
    fn call(&self, args: Vec<Typed>) -> Result<Vec<Typed>, CoercionError>;
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Handler<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoResults,
            $($arg: Shaped,)*
        {
            fn params() -> Vec<Shape> {
                vec![$(<$arg as Shaped>::shape()),*]
            }

            fn results() -> Vec<Shape> {
                R::shapes()
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, args: Vec<Typed>) -> Result<Vec<Typed>, CoercionError> {
                let expected = <[&str]>::len(&[$(stringify!($arg)),*]);
                let found = args.len();
                let mut args = args.into_iter();
                $(
                    let $arg = match args.next() {
                        Some(typed) => <$arg as Shaped>::from_typed(typed)?,
                        None => return Err(arity(expected, found)),
                    };
                )*
                Ok((self)($($arg),*).into_results())
            }
        }
    };
}

fn arity(expected: usize, found: usize) -> CoercionError {
    CoercionError::LengthMismatch { path: "args".into(), expected, found }
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);
