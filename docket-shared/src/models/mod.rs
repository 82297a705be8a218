/// Domain models for Docket
///
/// Plain data types shared by the storage layer, the lifecycle services and
/// the HTTP handlers. Persistence lives in [`crate::store`].
///
/// # Models
///
/// - `user`: accounts, roles and the public views of a user
/// - `address`: postal address embedded in users, companies, clients and projects
/// - `company`: company record owned by a user, including freelancer synthesis
/// - `client`: customers of a user
/// - `project`: work projects of a user for one client
/// - `delivery_note`: work and material records that can be signed once
///
/// # Example
///
/// ```
/// use docket_shared::models::delivery_note::{NoteFormat, MaterialLine, validate_lines};
///
/// let materials = vec![MaterialLine { name: "Cable".into(), quantity: 20.0, unit: "m".into() }];
/// assert!(validate_lines(NoteFormat::Materials, &[], &materials).is_ok());
/// assert!(validate_lines(NoteFormat::Both, &[], &materials).is_err());
/// ```

pub mod address;
pub mod client;
pub mod company;
pub mod delivery_note;
pub mod project;
pub mod user;
