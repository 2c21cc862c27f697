//! Data models for the GSE checkout server

pub mod certification;
pub mod checkout;
pub mod equipment;
pub mod settings;
pub mod user;

// Re-export commonly used types
pub use certification::{CertificationName, CertificationStatus, UserCertification};
pub use checkout::{CheckoutMode, ConfirmationReceipt, ReturnPolicy, SessionView};
pub use equipment::{EquipmentQuery, EquipmentStatus, EquipmentUnit};
pub use settings::PortalSettings;
pub use user::{Role, UserClaims};
