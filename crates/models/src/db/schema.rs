table! {
    documents (id) {
        id -> Uuid,
        seq -> Int8,
        kind -> Nullable<Varchar>,
        advisory_id -> Nullable<Varchar>,
        revision -> Varchar,
        data -> Jsonb,
    }
}
