//! HTTP protocol layer module
//!
//! Response builders shared by the dispatcher and the documentation routes.

pub mod response;

pub use response::{
    build_400_response, build_404_response, build_405_response, build_413_response,
    build_422_response, build_500_response, build_bytes_response, build_html_response,
    build_json_response, build_redirect_response,
};
