pub mod consts;
pub mod context;
pub mod correlate;
pub mod error;
pub mod filters;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod preprocess;
pub mod shift;
pub mod trajectory;
