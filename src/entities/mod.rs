//! Entity types - records read from the Nimbus OData API

pub mod agreement_type;
pub mod department;
pub mod location;
pub mod location_group;
pub mod schedule;
pub mod user;

pub use agreement_type::AgreementType;
pub use department::Department;
pub use location::Location;
pub use location_group::{GroupNode, LocationGroup, LocationGroupLocation, LocationGroupNesting};
pub use schedule::Schedule;
pub use user::User;
