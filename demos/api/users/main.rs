include!(env!("DYNROUTE_ABI"));

const USERS: &str = r#"[{"id":1,"name":"ada"},{"id":2,"name":"grace"}]"#;

extern "C" fn list(ctx: &mut RawContext) {
    ctx.set_header("content-type", "application/json");
    ctx.write(USERS.as_bytes());
}

extern "C" fn create(ctx: &mut RawContext) {
    let body = ctx.body().to_vec();
    if body.is_empty() {
        ctx.set_status(400);
        ctx.write(b"missing body");
        return;
    }
    ctx.set_status(201);
    ctx.set_header("content-type", "application/json");
    ctx.write(&body);
}

export_handler!(GET => list);
export_handler!(POST => create);
