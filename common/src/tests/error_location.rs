use crate::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` records the call site.
///
/// **WHY THIS MATTERS**: Every error in the workspace carries an `ErrorLocation`. A
/// broken capture turns each reported failure into a pointer at the wrong file.
///
/// **BUG THIS CATCHES**: Would catch if the file, line or column stopped being copied
/// out of the panic location.
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN / WHEN: Capturing the current location
    let expected_line = line!() + 1;
    let location = ErrorLocation::from(Location::caller());

    // THEN: File, line and column match this call site
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert_eq!(location.line, expected_line, "Should capture correct line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies the `[file:line:column]` display format used in error messages.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    let location = ErrorLocation::from(Location::caller());

    let formatted = location.to_string();

    assert!(formatted.starts_with('['), "Should start with '['");
    assert!(formatted.ends_with(']'), "Should end with ']'");
    assert!(formatted.contains(&format!(":{}:", location.line)));
    assert_eq!(
        formatted.matches(':').count(),
        2,
        "Should have exactly 2 colons"
    );
}

/// **VALUE**: Verifies that `#[track_caller]` helpers report their caller.
///
/// **BUG THIS CATCHES**: Would catch if error constructors lost `#[track_caller]`
/// and every connection error pointed at the constructor body.
#[test]
fn given_track_caller_helper_when_called_twice_then_each_call_site_differs() {
    #[track_caller]
    fn capture_location() -> ErrorLocation {
        ErrorLocation::from(Location::caller())
    }

    let first = capture_location();
    let second = capture_location();

    assert_eq!(first.file, second.file);
    assert_eq!(first.line + 1, second.line, "Lines should be sequential");
}
