diesel::table! {
    csv_files (id) {
        id -> Uuid,
        filename -> Text,
        rows_count -> Int8,
        columns_config -> Jsonb,
        uploaded_at -> Timestamptz,
    }
}

diesel::table! {
    csv_file_cells (file_id, row_number, column_index) {
        file_id -> Uuid,
        row_number -> Int8,
        column_index -> Int4,
        column_type -> Text,
        header -> Text,
        input_value -> Nullable<Text>,
    }
}

diesel::joinable!(csv_file_cells -> csv_files (file_id));

diesel::allow_tables_to_appear_in_same_query!(csv_files, csv_file_cells);
