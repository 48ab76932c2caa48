//! Static file extension to MIME type table.

use std::path::Path;

/// The MIME type for a file extension (without the dot), if known.
///
/// The lookup ignores ASCII case.
pub fn mime_type_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "js" => "text/javascript",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "xls" => "application/msexcel",
        "doc" => "application/msword",
        "ppt" => "application/mspowerpoint",
        "rtf" => "text/rtf",

        // StarOffice
        "sds" => "application/vnd.stardivision.chart",
        "sdc" => "application/vnd.stardivision.calc",
        "sdw" => "application/vnd.stardivision.writer",
        "sgl" => "application/vnd.stardivision.writer-global",
        "sda" => "application/vnd.stardivision.draw",
        "sdd" => "application/vnd.stardivision.impress",
        "sdf" => "application/vnd.stardivision.math",

        // OpenOffice.org 1.x
        "sxw" => "application/vnd.sun.xml.writer",
        "stw" => "application/vnd.sun.xml.writer.template",
        "sxg" => "application/vnd.sun.xml.writer.global",
        "sxc" => "application/vnd.sun.xml.calc",
        "stc" => "application/vnd.sun.xml.calc.template",
        "sxi" => "application/vnd.sun.xml.impress",
        "sti" => "application/vnd.sun.xml.impress.template",
        "sxd" => "application/vnd.sun.xml.draw",
        "std" => "application/vnd.sun.xml.draw.template",
        "sxm" => "application/vnd.sun.xml.math",

        // OpenDocument
        "odt" => "application/vnd.oasis.opendocument.text",
        "ott" => "application/vnd.oasis.opendocument.text-template",
        "oth" => "application/vnd.oasis.opendocument.text-web",
        "odm" => "application/vnd.oasis.opendocument.text-master",
        "odg" => "application/vnd.oasis.opendocument.graphics",
        "otg" => "application/vnd.oasis.opendocument.graphics-template",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "otp" => "application/vnd.oasis.opendocument.presentation-template",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "ots" => "application/vnd.oasis.opendocument.spreadsheet-template",
        "odc" => "application/vnd.oasis.opendocument.chart",
        "odf" => "application/vnd.oasis.opendocument.formula",
        "odb" => "application/vnd.oasis.opendocument.database",
        "odi" => "application/vnd.oasis.opendocument.image",

        // Office Open XML
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docm" => "application/vnd.ms-word.document.macroEnabled.12",
        "dotx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.template",
        "dotm" => "application/vnd.ms-word.template.macroEnabled.12",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsm" => "application/vnd.ms-excel.sheet.macroEnabled.12",
        "xltx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.template",
        "xltm" => "application/vnd.ms-excel.template.macroEnabled.12",
        "xlsb" => "application/vnd.ms-excel.sheet.binary.macroEnabled.12",
        "xlam" => "application/vnd.ms-excel.addin.macroEnabled.12",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptm" => "application/vnd.ms-powerpoint.presentation.macroEnabled.12",
        "ppsx" => "application/vnd.openxmlformats-officedocument.presentationml.slideshow",
        "ppsm" => "application/vnd.ms-powerpoint.slideshow.macroEnabled.12",
        "potx" => "application/vnd.openxmlformats-officedocument.presentationml.template",
        "potm" => "application/vnd.ms-powerpoint.template.macroEnabled.12",
        "ppam" => "application/vnd.ms-powerpoint.addin.macroEnabled.12",
        "sldx" => "application/vnd.openxmlformats-officedocument.presentationml.slide",
        "sldm" => "application/vnd.ms-powerpoint.slide.macroEnabled.12",
        "one" | "onetoc2" | "onetmp" | "onepkg" => "application/onenote",
        "thmx" => "application/vnd.ms-officetheme",

        _ => return None,
    };
    Some(mime)
}

/// The MIME type of a file, judged by its extension.
pub fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_type_for_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(mime_type_for_extension("pdf"), Some("application/pdf"));
        assert_eq!(mime_type_for_extension("htm"), Some("text/html"));
        assert_eq!(
            mime_type_for_extension("odt"),
            Some("application/vnd.oasis.opendocument.text")
        );
        assert_eq!(mime_type_for_extension("onetoc2"), Some("application/onenote"));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(mime_type_for_extension("PDF"), Some("application/pdf"));
        assert_eq!(mime_type_for_path(Path::new("/srv/Report.DOCX")), mime_type_for_extension("docx"));
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(mime_type_for_extension("xyz"), None);
        assert_eq!(mime_type_for_path(Path::new("/srv/README")), None);
        assert_eq!(mime_type_for_path(Path::new("/srv/archive.tar.zst")), None);
    }
}
