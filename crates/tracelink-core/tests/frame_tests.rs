use tracelink_core::frame::NO_LINE;
use tracelink_core::parse_line;

#[test]
fn test_standard_frame_round_trip() {
    let cases = [
        ("com.example.Service", "handle", "Service.java", 42),
        ("com.example.Outer$Inner", "<init>", "Outer.java", 7),
        ("org.acme.util.Strings", "lambda$trim$0", "Strings.java", 1),
        ("a.B", "c", "B.kt", 123456),
    ];
    for (class_name, method, file, line_number) in cases {
        let line = format!("\tat {class_name}.{method}({file}:{line_number})");
        let frame = parse_line(&line).unwrap_or_else(|| panic!("not a frame: {line}"));
        assert_eq!(frame.class_name(&line), class_name);
        assert_eq!(frame.method_name(&line), method);
        assert_eq!(frame.file_name.as_deref(), Some(file));
        assert_eq!(frame.line_number, line_number);
        assert_eq!(
            frame.file_line_range.substring(&line),
            format!("{file}:{line_number}")
        );
    }
}

#[test]
fn test_module_and_loader_prefixes() {
    let line = "\tat java.base/java.util.Objects.requireNonNull(Objects.java:209)";
    let frame = parse_line(line).unwrap();
    assert_eq!(frame.class_name(line), "java.util.Objects");

    let line = "\tat app//com.example.Main.main(Main.java:5)";
    let frame = parse_line(line).unwrap();
    assert_eq!(frame.class_name(line), "com.example.Main");

    let line = "\tat com.foo@1.2.3/com.foo.Api.call(Api.java:10)";
    let frame = parse_line(line).unwrap();
    assert_eq!(frame.class_name(line), "com.foo.Api");
}

#[test]
fn test_native_and_unknown_source() {
    let line = "\tat java.base/java.lang.System.arraycopy(Native Method)";
    let frame = parse_line(line).unwrap();
    assert_eq!(frame.class_name(line), "java.lang.System");
    assert_eq!(frame.method_name(line), "arraycopy");
    assert_eq!(frame.line_number, NO_LINE);
    assert!(!frame.has_source_line());

    let line = "\tat com.example.Gen.run(Unknown Source)";
    let frame = parse_line(line).unwrap();
    assert_eq!(frame.file_name, None);
    assert_eq!(frame.line_number, NO_LINE);
}

#[test]
fn test_ranges_are_ordered() {
    let line = "    at com.example.Service.handle(Service.java:42) ~[service.jar:1.0]";
    let frame = parse_line(line).unwrap();
    assert!(frame.class_name_range.end <= frame.method_name_range.start);
    assert!(frame.method_name_range.end <= frame.file_line_range.start);
    assert_eq!(frame.line_number, 42);
}

#[test]
fn test_lines_without_paren_are_not_frames() {
    assert!(parse_line("\tat com.example.Service.handle(Service.java:42").is_none());
    assert!(parse_line("\tat com.example.Service.handle").is_none());
    assert!(parse_line("java.lang.IllegalStateException: boom").is_none());
    assert!(parse_line("\t... 12 more").is_none());
    assert!(parse_line("").is_none());
}

#[test]
fn test_other_frame_shapes() {
    let line = "com.example.Service.handle(String) Service.java:42";
    let frame = parse_line(line).unwrap();
    assert_eq!(frame.class_name(line), "com.example.Service");
    assert_eq!(frame.line_number, 42);

    let line = " - com.example.Service.handle() @bci=3, line=17 (Compiled frame)";
    let frame = parse_line(line).unwrap();
    assert_eq!(frame.method_name(line), "handle");
    assert_eq!(frame.line_number, 17);

    let line = "| \tat com.example.Service.handle(Service.java:42)";
    let frame = parse_line(line).unwrap();
    assert_eq!(frame.class_name(line), "com.example.Service");
}
