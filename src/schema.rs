// Mirrors the DDL in repository/migrations.rs.

diesel::table! {
    calls (id) {
        id -> BigInt,
        salvo_no -> BigInt,
        req_no -> BigInt,
        status -> Integer,
        req_start -> BigInt,
        res_finish -> BigInt,
        attempt_no -> Integer,
        char_count -> BigInt,
    }
}

diesel::table! {
    characters (id) {
        id -> BigInt,
        call_id -> BigInt,
        ch -> Text,
        freq -> BigInt,
    }
}

diesel::table! {
    lines (id) {
        id -> BigInt,
        url -> Text,
        longest_length -> BigInt,
    }
}

diesel::joinable!(characters -> calls (call_id));

diesel::allow_tables_to_appear_in_same_query!(calls, characters, lines,);
