pub mod dispatcher;
pub mod manager;
pub mod uploader;
