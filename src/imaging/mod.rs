pub mod composite;
pub mod convert;
pub mod metadata;
pub mod template;
