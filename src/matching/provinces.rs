use std::collections::HashSet;
use std::sync::OnceLock;

static SERVED_PROVINCES: OnceLock<HashSet<&'static str>> = OnceLock::new();

/// Whether the trimmed province name belongs to the served allow-list.
///
/// Spelling is matched exactly, including the `Ð` (U+00D0) variant used for Đồng Nai in the
/// catalog, so callers must not re-case or transliterate before asking.
pub fn is_province_valid(province: &str) -> bool {
    served_provinces().contains(province.trim())
}

pub fn served_provinces() -> &'static HashSet<&'static str> {
    SERVED_PROVINCES.get_or_init(|| {
        const PROVINCES: &[&str] = &[
            "An Giang",
            "Bạc Liêu",
            "Bình Dương",
            "Bình Phước",
            "Cà Mau",
            "Cần Thơ",
            "\u{D0}ồng Nai",
            "Đồng Tháp",
            "Đà Lạt",
            "Hậu Giang",
            "TP. Hồ Chí Minh",
            "Kiên Giang",
            "Long An",
            "Tiền Giang",
            "Trà Vinh",
            "Vĩnh Long",
            "Vũng Tàu",
        ];

        PROVINCES.iter().copied().collect()
    })
}
