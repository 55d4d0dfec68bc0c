//! Local photo gallery core.
//!
//! Photos and albums are persisted as two whole-replaced JSON collections in a
//! key-value backend. The [`coordinator::Coordinator`] owns every mutation and
//! keeps albums referentially consistent with the photo collection; the
//! [`gallery::Gallery`] facade wires it to the capture, edit and file services.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod gallery;
pub mod ids;
pub mod locks;
pub mod media;
pub mod models;
pub mod store;
pub mod timeline;

pub use config::Config;
pub use coordinator::{AlbumOutcome, AlbumUpdate, Coordinator, IntegrityReport, PhotoDeletion};
pub use error::{GalleryError, GalleryResult};
pub use gallery::Gallery;
pub use models::{Album, Photo, PhotoPatch};
