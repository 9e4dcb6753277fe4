/// Type must have new() and as_uuid() methods. Also diesel::FromSqlRow and
/// diesel::AsExpression derives are needed.
///
/// ```ignore
/// #[derive(
///     diesel::FromSqlRow,
///     diesel::AsExpression,
/// )]
/// #[diesel(sql_type = Binary)]
/// pub struct UuidWrapper {
///     uuid: uuid::Uuid,
/// }
///
/// impl UuidWrapper {
///     pub fn new(uuid: uuid::Uuid) -> Self {
///         Self { uuid }
///     }
///
///     pub fn as_uuid(&self) -> &uuid::Uuid {
///         &self.uuid
///     }
/// }
///
/// diesel_uuid_wrapper!(UuidWrapper);
///
/// ```
///
#[macro_export]
macro_rules! diesel_uuid_wrapper {
    ($name:ty) => {
        impl<DB: diesel::backend::Backend>
            diesel::deserialize::FromSql<diesel::sql_types::Binary, DB> for $name
        where
            Vec<u8>: diesel::deserialize::FromSql<diesel::sql_types::Binary, DB>,
        {
            fn from_sql(
                bytes: <DB as diesel::backend::Backend>::RawValue<'_>,
            ) -> diesel::deserialize::Result<Self> {
                let bytes = Vec::<u8>::from_sql(bytes)?;
                let uuid = uuid::Uuid::from_slice(&bytes)?;
                Ok(<$name>::new(uuid))
            }
        }

        impl<DB: diesel::backend::Backend> diesel::serialize::ToSql<diesel::sql_types::Binary, DB>
            for $name
        where
            [u8]: diesel::serialize::ToSql<diesel::sql_types::Binary, DB>,
        {
            fn to_sql<'b>(
                &'b self,
                out: &mut diesel::serialize::Output<'b, '_, DB>,
            ) -> diesel::serialize::Result {
                let uuid = self.as_uuid();
                let bytes = uuid.as_bytes();
                <[u8] as diesel::serialize::ToSql<diesel::sql_types::Binary, DB>>::to_sql(
                    bytes.as_slice(),
                    out,
                )
            }
        }
    };
}

pub(crate) use diesel_uuid_wrapper;

/// Type must have new() and as_i64() methods.
/// Also diesel::FromSqlRow and diesel::AsExpression derives are needed.
#[macro_export]
macro_rules! diesel_i64_wrapper {
    ($name:ty) => {
        impl<DB: diesel::backend::Backend>
            diesel::deserialize::FromSql<diesel::sql_types::BigInt, DB> for $name
        where
            i64: diesel::deserialize::FromSql<diesel::sql_types::BigInt, DB>,
        {
            fn from_sql(
                value: <DB as diesel::backend::Backend>::RawValue<'_>,
            ) -> diesel::deserialize::Result<Self> {
                let value = i64::from_sql(value)?;
                Ok(<$name>::new(value))
            }
        }

        impl<DB: diesel::backend::Backend> diesel::serialize::ToSql<diesel::sql_types::BigInt, DB>
            for $name
        where
            i64: diesel::serialize::ToSql<diesel::sql_types::BigInt, DB>,
        {
            fn to_sql<'b>(
                &'b self,
                out: &mut diesel::serialize::Output<'b, '_, DB>,
            ) -> diesel::serialize::Result {
                self.as_i64().to_sql(out)
            }
        }
    };
}

pub(crate) use diesel_i64_wrapper;

/// Enum type must have `TryFrom<&str>` implementation and `as_str()` method.
/// Also diesel::FromSqlRow and diesel::AsExpression derives are needed.
///
/// ```ignore
/// #[derive(
///     diesel::FromSqlRow,
///     diesel::AsExpression,
/// )]
/// #[diesel(sql_type = Text)]
/// pub enum TextEnum {
///     Value,
/// }
///
/// impl TextEnum {
///     pub fn as_str(&self) -> &'static str {
///         "value"
///     }
/// }
///
/// impl TryFrom<&str> for TextEnum {
///     type Error = String;
///
///     fn try_from(value: &str) -> Result<Self, Self::Error> {
///         match value {
///             "value" => Ok(Self::Value),
///             value => Err(format!("Unknown value {}", value)),
///         }
///     }
/// }
///
/// diesel_text_try_from!(TextEnum);
///
/// ```
#[macro_export]
macro_rules! diesel_text_try_from {
    ($name:ty) => {
        impl<DB: diesel::backend::Backend> diesel::deserialize::FromSql<diesel::sql_types::Text, DB>
            for $name
        where
            String: diesel::deserialize::FromSql<diesel::sql_types::Text, DB>,
        {
            fn from_sql(
                value: <DB as diesel::backend::Backend>::RawValue<'_>,
            ) -> diesel::deserialize::Result<Self> {
                let value = String::from_sql(value)?;
                TryInto::<$name>::try_into(value.as_str()).map_err(|e| e.into())
            }
        }

        impl<DB: diesel::backend::Backend> diesel::serialize::ToSql<diesel::sql_types::Text, DB>
            for $name
        where
            str: diesel::serialize::ToSql<diesel::sql_types::Text, DB>,
        {
            fn to_sql<'b>(
                &'b self,
                out: &mut diesel::serialize::Output<'b, '_, DB>,
            ) -> diesel::serialize::Result {
                self.as_str().to_sql(out)
            }
        }
    };
}

pub(crate) use diesel_text_try_from;
