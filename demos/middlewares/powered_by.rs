include!(env!("DYNROUTE_ABI"));

extern "C" fn powered_by(ctx: &mut RawContext) {
    ctx.set_header("x-powered-by", "dynroute");
    if ctx.header("x-block").is_some() {
        ctx.set_status(403);
        ctx.write(b"blocked");
        ctx.abort();
    }
}

export_handler!(GET => powered_by);
