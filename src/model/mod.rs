pub mod attendance;
pub mod leave_request;
pub mod role;
pub mod training;
pub mod user;

use sqlx::{
    Decode, Encode, MySql, Type,
    encode::IsNull,
    error::BoxDynError,
    mysql::{MySqlTypeInfo, MySqlValueRef},
};

/// Closed enums are stored as their snake_case names in VARCHAR columns.
macro_rules! mysql_string_enum {
    ($($ty:ty),+ $(,)?) => {$(
        impl Type<MySql> for $ty {
            fn type_info() -> MySqlTypeInfo {
                <str as Type<MySql>>::type_info()
            }

            fn compatible(ty: &MySqlTypeInfo) -> bool {
                <str as Type<MySql>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, MySql> for $ty {
            fn decode(value: MySqlValueRef<'r>) -> Result<Self, BoxDynError> {
                let raw = <&str as Decode<MySql>>::decode(value)?;
                Ok(raw.parse::<$ty>()?)
            }
        }

        impl<'q> Encode<'q, MySql> for $ty {
            fn encode_by_ref(&self, buf: &mut Vec<u8>) -> IsNull {
                <&str as Encode<MySql>>::encode(self.as_ref(), buf)
            }
        }
    )+};
}

mysql_string_enum!(
    role::Role,
    attendance::AttendanceStatus,
    attendance::CheckMethod,
    leave_request::LeaveType,
    leave_request::LeaveStatus,
    training::AttendeeStatus,
    training::AssessmentResult,
);
