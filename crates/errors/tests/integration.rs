//! Integration tests for error types

#[cfg(test)]
mod tests {
    use hydrofetch_errors::*;

    #[test]
    fn test_error_conversion() {
        let net_err = NetworkError::Timeout {
            url: "https://example.com".into(),
        };
        let err: Error = net_err.into();
        assert!(matches!(err, Error::Network(_)));

        let err: Error = ProviderError::PreparationFailed { status: 503 }.into();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::PreparationFailed { status: 503 })
        ));
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::DiskFull {
            path: "/data/out".into(),
        };
        assert_eq!(err.to_string(), "disk full: /data/out");

        let err = ProviderError::PreparationFailed { status: 503 };
        assert!(err.to_string().contains("status code 503"));
    }

    #[test]
    fn test_error_clone() {
        let err = ProviderError::LayoutMismatch {
            expected: "abc/data/contents".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::PermissionDenied { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists");
        let storage_err = StorageError::from_io_with_path(&io_err, std::path::Path::new("/x/a"));
        assert!(matches!(storage_err, StorageError::AlreadyExists { ref path } if path == "/x/a"));
    }

    #[test]
    fn test_user_facing_codes() {
        let err: Error = ProviderError::NotApplicable {
            identifier: "https://example.org".into(),
        }
        .into();
        assert_eq!(err.user_code(), Some("provider.not_applicable"));
        assert!(err.user_hint().is_some());
        assert!(!err.is_retryable());

        let err: Error = NetworkError::HttpError {
            status: 502,
            message: "Bad Gateway".into(),
        }
        .into();
        assert!(err.is_retryable());
        assert_eq!(Error::Cancelled.user_code(), Some("error.cancelled"));
    }
}
