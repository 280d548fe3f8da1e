include!(env!("DYNROUTE_ABI"));

extern "C" fn echo(ctx: &mut RawContext) {
    let line = format!("{} {}?{} from {}\n", ctx.method(), ctx.path(), ctx.query(), ctx.client_ip());
    let body = ctx.body().to_vec();
    ctx.set_header("content-type", "text/plain");
    ctx.write(line.as_bytes());
    ctx.write(&body);
}

export_handler!(POST => echo);
export_handler!(PUT => echo);
