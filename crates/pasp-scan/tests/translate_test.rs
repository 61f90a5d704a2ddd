//! End-to-end translation scenarios through the public API.

use std::io;

use pasp_scan::profile::{LanguageProfile, PROLOGUE};
use pasp_scan::{translate, translate_to_vec, Construct, ScanError, StreamWriter, WriteError};

fn translate_str(src: &str) -> String {
    String::from_utf8(translate_to_vec(src.as_bytes()).unwrap()).unwrap()
}

fn framed(profile: LanguageProfile, body: &str) -> String {
    let mut s = String::from_utf8(PROLOGUE.to_vec()).unwrap();
    s.push_str(body);
    s.push_str(std::str::from_utf8(profile.generate()).unwrap());
    s.push_str("%>");
    s
}

#[test]
fn test_plain_text_line() {
    assert_eq!(
        translate_str("Hello\r\n"),
        framed(LanguageProfile::VbScript, "XMLServDoc.WriteLine \"Hello\"\r\n")
    );
}

#[test]
fn test_prologue_declares_document_builder() {
    let out = translate_str("x");
    assert!(out.starts_with(
        "<OBJECT RUNAT=server ID=XMLServDoc PROGID=\"XSLISAPI.XMLServerDocument\"></OBJECT>\r\n<%\r\n"
    ));
    assert!(out.ends_with("End If\r\n%>"));
}

#[test]
fn test_embedded_quote_jscript() {
    let src = "<%@ LANGUAGE=JScript %>\r\nSay \"hi\"\r\n";
    let out = translate_str(src);
    assert!(out.contains("XMLServDoc.WriteLine(\"Say \\\"hi\\\"\");\r\n"));
    assert!(out.ends_with("}\r\n%>"));
}

#[test]
fn test_embedded_quote_vbscript() {
    let out = translate_str("Say \"hi\"\r\n");
    assert!(out.contains("XMLServDoc.WriteLine \"Say \" & Chr(34) & \"hi\" & Chr(34)\r\n"));
}

#[test]
fn test_directive_rewrite_preserves_arguments() {
    let out = translate_str("<% response.write(1); %>");
    assert_eq!(
        out,
        framed(LanguageProfile::VbScript, " XMLServDoc.Write(1); \r\n")
    );
}

#[test]
fn test_all_response_methods_are_rewritten() {
    let out = translate_str("<% Response.Flush\r\nRESPONSE.CLEAR\r\nResponse.End %>");
    assert!(out.contains("XMLServDoc.Flush\r\nXMLServDoc.Clear\r\nXMLServDoc.End"));
    assert!(!out.to_ascii_uppercase().contains("RESPONSE."));
}

#[test]
fn test_unterminated_directive() {
    let err = translate_to_vec(b"Hello\r\n<% x = 1").unwrap_err();
    assert!(matches!(
        err,
        ScanError::Syntax {
            construct: Construct::Directive,
            line: 2,
            ..
        }
    ));
}

#[test]
fn test_unterminated_object_block() {
    let err = translate_to_vec(b"<OBJECT RUNAT=server ID=a>").unwrap_err();
    assert!(matches!(
        err,
        ScanError::Syntax {
            construct: Construct::ObjectBlock,
            ..
        }
    ));
}

#[test]
fn test_unsupported_language() {
    let err = translate_to_vec(b"<%@ LANGUAGE=\"PerlScript\" %>\r\n").unwrap_err();
    match err {
        ScanError::UnsupportedLanguage { name } => assert_eq!(name, "PerlScript"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_language_directive_is_kept_in_place() {
    let out = translate_str("<%@ LANGUAGE=VBScript %>\r\nA\r\n");
    assert!(out.contains("%>\r\n<%@  LANGUAGE=VBScript  %><%\r\n"));
    assert!(out.contains("XMLServDoc.WriteLine \"\"\r\nXMLServDoc.WriteLine \"A\"\r\n"));
}

#[test]
fn test_output_directive_jscript() {
    let out = translate_str("<%@ language=jscript %>Total: <%= n + 1 %>\r\n");
    assert!(out.contains("XMLServDoc.Write(\"Total: \");\r\nXMLServDoc.Write( n + 1 );\r\n"));
}

#[test]
fn test_server_script_block_leaves_code_region() {
    let src = "<script language=vbscript runat=server>\r\nSub F\r\n  Response.Write \"x\"\r\nEnd Sub\r\n</SCRIPT>\r\n";
    let out = translate_str(src);
    assert!(out.contains(
        "%>\r\n<script language=vbscript runat=server>\r\nSub F\r\n  XMLServDoc.Write \"x\"\r\nEnd Sub\r\n</SCRIPT><%\r\n"
    ));
}

// '\'' opens a quote only inside a tag; an apostrophe in body text must not
// hide the directive that follows.
#[test]
fn test_apostrophe_in_text_is_not_a_quote() {
    let out = translate_str("Don't <%= x %>\r\n");
    assert!(out.contains("XMLServDoc.Write \"Don't \"\r\nXMLServDoc.Write  x \r\n"));
}

// A double quote inside a single-quoted attribute is ignored by the quote
// register, so the '>' that follows still closes the tag.
#[test]
fn test_mixed_quotes_in_attribute() {
    let out = translate_str("<a title='6\" pipe'><script runat=server></script>");
    assert!(out.contains("XMLServDoc.Write \"<a title='6\" & Chr(34) & \" pipe'>\"\r\n%>\r\n<script"));
}

struct FailAfter {
    remaining: usize,
}

impl io::Write for FailAfter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::other("sink closed"));
        }
        let n = buf.len().min(self.remaining);
        self.remaining -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_writer_failure_aborts_translation() {
    let sink = StreamWriter::new(FailAfter { remaining: 100 });
    let err = translate(b"line one\r\nline two\r\n", sink).unwrap_err();
    assert!(matches!(err, ScanError::Write(WriteError::Io(_))));
}

#[test]
fn test_stream_writer_matches_vec_output() {
    let src = b"<p class=\"x\">\r\n<% Response.Write 1 %>\r\n";
    let mut sink = StreamWriter::new(Vec::new());
    translate(src, &mut sink).unwrap();
    let expected = translate_to_vec(src).unwrap();
    assert_eq!(sink.bytes_written(), expected.len() as u64);
    assert_eq!(sink.into_inner(), expected);
}
