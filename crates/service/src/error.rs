use thiserror::Error;
use tradekit_core::common::ValidationError;
use tradekit_core::price::error::PriceError;
use tradekit_core::store::error::StoreError;

/// # Summary
/// 服务层错误，原样包裹各端口的错误，由 HTTP 层决定如何映射。
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Price(#[from] PriceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// 是否属于调用方参数错误 (包括抓取参数在适配器内的二次校验)。
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ServiceError::Validation(_) | ServiceError::Price(PriceError::Validation(_))
        )
    }

    /// 是否属于数据不存在。
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::Store(StoreError::NotFound(_)) | ServiceError::Price(PriceError::NotFound)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let e: ServiceError = ValidationError::ZeroLimit.into();
        assert!(e.is_validation());
        assert!(!e.is_not_found());

        let e: ServiceError = PriceError::Validation(ValidationError::StartInFuture).into();
        assert!(e.is_validation());

        let e: ServiceError = StoreError::NotFound("tf_4h".into()).into();
        assert!(e.is_not_found());
        assert_eq!(e.to_string(), "Not found: tf_4h");

        let e: ServiceError = StoreError::Database("locked".into()).into();
        assert!(!e.is_validation() && !e.is_not_found());
    }
}
