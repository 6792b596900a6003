//! Built-in Vedic astrology vocabulary.
//!
//! Generic English outcome words ("result", "effect") are deliberately left
//! out: they appear in off-topic text as often as in chart readings.

pub(super) const TERMS: &[(&str, &[&str])] = &[
    // Core framework
    ("jyotisha", &["jyotiṣa", "jyotish", "astrology", "astrological", "astrologer"]),
    ("horoscope", &["kundali", "kuṇḍalī", "janma kundali", "birth chart", "natal chart", "chart"]),
    ("zodiac", &["bhachakra", "bhacakra"]),
    ("graha", &["planet", "planetary"]),
    ("rashi", &["rāśi", "rasi", "sign", "zodiac sign", "moon sign"]),
    ("bhava", &["bhāva", "house"]),
    ("lagna", &["ascendant", "lagnesh", "lagneśa", "rising sign"]),
    ("nakshatra", &["nakṣatra", "lunar mansion", "constellation", "pada"]),
    ("dasha", &["daśā", "dasa", "mahadasha", "mahādaśā", "antardasha", "antardaśā", "bhukti", "period"]),
    ("gochara", &["gocara", "transit"]),
    ("yoga", &["yogas", "raja yoga", "rāja yoga", "dhana yoga"]),
    ("karaka", &["kāraka", "significator", "atmakaraka", "ātmakāraka"]),
    ("drishti", &["dṛṣṭi", "drsti", "aspect"]),
    ("uccha", &["ucca", "exaltation", "exalted"]),
    ("neecha", &["nīca", "nica", "debilitation", "debilitated"]),
    ("varga", &["divisional chart", "shodashavarga", "ṣoḍaśavarga"]),
    ("navamsa", &["navāṃśa", "navamsha", "navamśa", "d9"]),
    ("ashtakavarga", &["aṣṭakavarga", "bindu", "sarvashtakavarga"]),
    ("ayanamsa", &["ayanāṃśa", "ayanamsha", "precession"]),
    ("panchanga", &["pañcāṅga", "panchang"]),
    ("tithi", &["lunar day"]),
    ("muhurta", &["muhūrta", "electional"]),
    ("prediction", &["predictive", "predict", "forecast"]),
    // Jaimini system
    ("jaimini", &["jaiminī"]),
    ("sutra", &["sūtra", "upadesa sutra", "upadeśa sūtra"]),
    ("argala", &["virodhargala", "virodhārgala", "intervention"]),
    ("svamsa", &["svāṃśa", "swamsa", "karakamsa", "kārakāṃśa"]),
    ("arudha", &["ārūḍha", "arudha pada", "upapada"]),
    ("chara", &["cara", "chara dasha", "movable sign"]),
    // The nine grahas
    ("surya", &["sūrya", "ravi", "sun"]),
    ("chandra", &["candra", "soma", "moon"]),
    ("mangala", &["maṅgala", "kuja", "mars"]),
    ("budha", &["mercury"]),
    ("guru", &["bṛhaspati", "brihaspati", "jupiter"]),
    ("shukra", &["śukra", "venus"]),
    ("shani", &["śani", "saturn"]),
    ("rahu", &["rāhu", "north node"]),
    ("ketu", &["south node"]),
    // Classical texts
    ("parashara", &["parāśara", "bphs", "hora shastra", "horāśāstra"]),
];
