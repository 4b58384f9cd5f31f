// Repositories Module
// sqlx implementations of the store traits

pub mod certificate_repository;

pub use certificate_repository::CertificateRepositoryImpl;
