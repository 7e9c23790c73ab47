//! Operation guard
//!
//! Every API call is described by an `ApiCall` value naming its resource and
//! operation and knowing how to validate its own parameters. `ensure_valid`
//! runs the permission check and the validation in one pass and hands back
//! the aggregated `Status` when anything failed. The client pre-flight and
//! the server run exactly the same guard.

use serde_json::Value;

use crate::ids::is_identifier;
use crate::model::FILE_DATA;
use crate::permissions::PermissionMatrix;
use crate::status::Status;
use crate::validation;

/// A permission-checked, validated API call
pub trait ApiCall {
    /// Resource name in the permission matrix
    const RESOURCE: &'static str;

    /// Operation name in the permission matrix
    fn operation(&self) -> &'static str;

    /// Validate the call's parameters into `status`
    fn validate(&self, status: &mut Status);
}

/// Calls on the `file` resource
#[derive(Debug, Clone, Copy)]
pub enum FileCall<'a> {
    /// add(file)
    Add(Option<&'a Value>),
    /// get(file_id)
    Get(Option<&'a Value>),
    /// list()
    List,
}

impl FileCall<'_> {
    /// Fields a file must carry to be added
    pub const ADD_REQUIRED: &'static [&'static str] = &["content_type", "metadata", "data"];
}

impl ApiCall for FileCall<'_> {
    const RESOURCE: &'static str = "file";

    fn operation(&self) -> &'static str {
        match self {
            FileCall::Add(_) => "add",
            FileCall::Get(_) => "get",
            FileCall::List => "list",
        }
    }

    fn validate(&self, status: &mut Status) {
        match self {
            FileCall::Add(file) => {
                validation::validate(status, *file, &FILE_DATA, Self::ADD_REQUIRED);
            }
            FileCall::Get(file_id) => match file_id {
                Some(value) if is_identifier(value) => {}
                Some(_) => {
                    status.set_error("file_id.err", "invalid file id");
                }
                None => {
                    status.set_error("file_id.err", "file id missing");
                }
            },
            FileCall::List => {}
        }
    }
}

/// Check permission and parameters of `call` for a caller with `role`.
///
/// Returns `Err` with every collected failure; the caller must not perform
/// the operation in that case.
pub fn ensure_valid<C: ApiCall>(
    matrix: &PermissionMatrix,
    role: Option<&str>,
    call: &C,
) -> Result<(), Status> {
    let mut status = Status::new();
    matrix.check_permission(role, C::RESOURCE, call.operation(), &mut status);
    call.validate(&mut status);

    if status.is_success() {
        Ok(())
    } else {
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matrix() -> PermissionMatrix {
        PermissionMatrix::default()
    }

    #[test]
    fn test_valid_add_passes() {
        let file = json!({
            "content_type": "image/png",
            "metadata": {"upload_dt": "2024-05-01T12:30:00Z"},
            "data": "iVBORw0K"
        });
        assert!(ensure_valid(&matrix(), Some("client"), &FileCall::Add(Some(&file))).is_ok());
    }

    #[test]
    fn test_empty_content_type_scenario() {
        let file = json!({
            "content_type": "",
            "metadata": {"upload_dt": "2024-05-01T12:30:00Z"},
            "data": "aGVsbG8="
        });
        let status =
            ensure_valid(&matrix(), Some("agent"), &FileCall::Add(Some(&file))).unwrap_err();
        assert_eq!(status.error_keys(), vec!["content_type.err"]);
    }

    #[test]
    fn test_denied_role_collects_validation_too() {
        let status = ensure_valid(&matrix(), None, &FileCall::Add(Some(&json!({})))).unwrap_err();
        assert_eq!(
            status.error_keys(),
            vec!["permission.err", "content_type.err", "metadata.err", "data.err"]
        );
    }

    #[test]
    fn test_denied_role_with_valid_input() {
        let status = ensure_valid(&matrix(), Some("client"), &FileCall::List).unwrap_err();
        assert_eq!(status.error_keys(), vec!["permission.err"]);
        assert!(ensure_valid(&matrix(), Some("admin"), &FileCall::List).is_ok());
    }

    #[test]
    fn test_get_identifier_forms() {
        let native = json!({"$oid": "507f1f77bcf86cd799439011"});
        let text = json!("507f1f77bcf86cd799439011");
        assert!(ensure_valid(&matrix(), None, &FileCall::Get(Some(&native))).is_ok());
        assert!(ensure_valid(&matrix(), None, &FileCall::Get(Some(&text))).is_ok());

        let status = ensure_valid(&matrix(), None, &FileCall::Get(Some(&json!(12)))).unwrap_err();
        assert_eq!(status.message("file_id.err"), Some("invalid file id"));

        let status = ensure_valid(&matrix(), None, &FileCall::Get(None)).unwrap_err();
        assert_eq!(status.message("file_id.err"), Some("file id missing"));
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(FileCall::Add(None).operation(), "add");
        assert_eq!(FileCall::Get(None).operation(), "get");
        assert_eq!(FileCall::List.operation(), "list");
        assert_eq!(<FileCall<'static> as ApiCall>::RESOURCE, "file");
    }
}
