//! Diesel schema definitions.

diesel::table! {
    device_tokens (id) {
        id -> Integer,
        token -> Text,
        platform -> Text,
        user_id -> Nullable<Text>,
        device_info -> Nullable<Text>,
        app_version -> Nullable<Text>,
        is_active -> Bool,
        last_used_at -> Timestamp,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    push_notifications_log (id) {
        id -> Integer,
        notification_type -> Text,
        title -> Text,
        body -> Text,
        data -> Text,
        platform -> Nullable<Text>,
        total_sent -> Integer,
        total_failed -> Integer,
        total_tokens -> Integer,
        sent_by -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(device_tokens, push_notifications_log);
