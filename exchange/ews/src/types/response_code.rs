/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{convert::Infallible, fmt, str::FromStr};

macro_rules! response_codes {
    ($($code:ident),* $(,)?) => {
        /// The result code of a response message or SOAP fault.
        ///
        /// Codes this crate does not know about are kept verbatim in
        /// [`ResponseCode::Other`].
        ///
        /// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/responsecode>.
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub enum ResponseCode {
            $($code,)*
            Other(String),
        }

        impl ResponseCode {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$code => stringify!($code),)*
                    Self::Other(code) => code,
                }
            }
        }

        impl FromStr for ResponseCode {
            type Err = Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(match s.trim() {
                    $(stringify!($code) => Self::$code,)*
                    other => Self::Other(other.to_string()),
                })
            }
        }
    };
}

response_codes! {
    NoError,
    ErrorAccessDenied,
    ErrorAccountDisabled,
    ErrorAttachmentSizeLimitExceeded,
    ErrorBatchProcessingStopped,
    ErrorCannotDeleteObject,
    ErrorChangeKeyRequired,
    ErrorChangeKeyRequiredForWriteOperations,
    ErrorConnectionFailed,
    ErrorCorruptData,
    ErrorCreateItemAccessDenied,
    ErrorExceededConnectionCount,
    ErrorExpiredSubscription,
    ErrorFolderNotFound,
    ErrorIncorrectSchemaVersion,
    ErrorIncorrectUpdatePropertyCount,
    ErrorInternalServerError,
    ErrorInternalServerTransientError,
    ErrorInvalidAttachmentId,
    ErrorInvalidChangeKey,
    ErrorInvalidExchangeImpersonationHeaderData,
    ErrorInvalidIdMalformed,
    ErrorInvalidOperation,
    ErrorInvalidPropertyForOperation,
    ErrorInvalidPropertyRequest,
    ErrorInvalidPropertySet,
    ErrorInvalidPullSubscriptionId,
    ErrorInvalidPushSubscriptionUrl,
    ErrorInvalidRecipients,
    ErrorInvalidRequest,
    ErrorInvalidServerVersion,
    ErrorInvalidSubscription,
    ErrorInvalidSubscriptionRequest,
    ErrorInvalidWatermark,
    ErrorIrresolvableConflict,
    ErrorItemCorrupt,
    ErrorItemNotFound,
    ErrorItemSave,
    ErrorMailboxStoreUnavailable,
    ErrorMessageSizeExceeded,
    ErrorMissingEmailAddress,
    ErrorMissingRecipients,
    ErrorMoveCopyFailed,
    ErrorNonExistentMailbox,
    ErrorNotEnoughMemory,
    ErrorObjectTypeChanged,
    ErrorQuotaExceeded,
    ErrorReadEventsFailed,
    ErrorRecurrenceHasNoOccurrence,
    ErrorSchemaValidation,
    ErrorSendAsDenied,
    ErrorServerBusy,
    ErrorStaleObject,
    ErrorSubscriptionAccessDenied,
    ErrorSubscriptionNotFound,
    ErrorSubscriptionUnsubscribed,
    ErrorTimeoutExpired,
    ErrorTooManyObjectsOpened,
    ErrorUnsupportedPropertyDefinition,
}

impl Default for ResponseCode {
    fn default() -> Self {
        ResponseCode::NoError
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_are_preserved() {
        assert_eq!(
            "ErrorServerBusy".parse::<ResponseCode>(),
            Ok(ResponseCode::ErrorServerBusy)
        );

        let code: ResponseCode = "ErrorSomethingNew".parse().unwrap();
        assert_eq!(code, ResponseCode::Other("ErrorSomethingNew".to_string()));
        assert_eq!(code.to_string(), "ErrorSomethingNew");
    }
}
