pub mod display_names;
pub mod s3;
