mod info;
mod redirect;

pub use info::info_handler;
pub use redirect::{not_found_handler, redirect_handler, request_meta};
