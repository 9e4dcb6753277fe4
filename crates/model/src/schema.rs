// Keep in sync with database/migrations.

diesel::table! {
    profile_sanction (account_id) {
        account_id -> Binary,
        violation_count -> BigInt,
        is_banned -> Bool,
        ban_reason -> Nullable<Text>,
        banned_at -> Nullable<BigInt>,
        banned_until -> Nullable<BigInt>,
    }
}

diesel::table! {
    content_violation (id) {
        id -> BigInt,
        account_id -> Binary,
        violation_type -> Text,
        severity -> Text,
        moderation_details -> Text,
        image_data -> Nullable<Binary>,
        created_at -> BigInt,
    }
}
