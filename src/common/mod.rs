pub mod response;
pub mod template;
pub mod upload;
