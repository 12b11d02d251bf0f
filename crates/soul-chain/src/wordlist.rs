//! The 256-word mnemonic list. 16 words drawn independently give 128 bits
//! of entropy (8 bits per word). The list is fixed: changing it would
//! invalidate every previously generated token.

pub const WORDLIST: [&str; 256] = [
    "babab", "cabab", "dabab", "fabab", "gabab", "habab", "jabab", "kabab",
    "labab", "mabab", "nabab", "pabab", "rabab", "sabab", "tabab", "vabab",
    "wabab", "zabab", "bebab", "cebab", "debab", "febab", "gebab", "hebab",
    "jebab", "kebab", "lebab", "mebab", "nebab", "pebab", "rebab", "sebab",
    "tebab", "vebab", "webab", "zebab", "bibab", "cibab", "dibab", "fibab",
    "gibab", "hibab", "jibab", "kibab", "libab", "mibab", "nibab", "pibab",
    "ribab", "sibab", "tibab", "vibab", "wibab", "zibab", "bobab", "cobab",
    "dobab", "fobab", "gobab", "hobab", "jobab", "kobab", "lobab", "mobab",
    "nobab", "pobab", "robab", "sobab", "tobab", "vobab", "wobab", "zobab",
    "bubab", "cubab", "dubab", "fubab", "gubab", "hubab", "jubab", "kubab",
    "lubab", "mubab", "nubab", "pubab", "rubab", "subab", "tubab", "vubab",
    "wubab", "zubab", "bacab", "cacab", "dacab", "facab", "gacab", "hacab",
    "jacab", "kacab", "lacab", "macab", "nacab", "pacab", "racab", "sacab",
    "tacab", "vacab", "wacab", "zacab", "becab", "cecab", "decab", "fecab",
    "gecab", "hecab", "jecab", "kecab", "lecab", "mecab", "necab", "pecab",
    "recab", "secab", "tecab", "vecab", "wecab", "zecab", "bicab", "cicab",
    "dicab", "ficab", "gicab", "hicab", "jicab", "kicab", "licab", "micab",
    "nicab", "picab", "ricab", "sicab", "ticab", "vicab", "wicab", "zicab",
    "bocab", "cocab", "docab", "focab", "gocab", "hocab", "jocab", "kocab",
    "locab", "mocab", "nocab", "pocab", "rocab", "socab", "tocab", "vocab",
    "wocab", "zocab", "bucab", "cucab", "ducab", "fucab", "gucab", "hucab",
    "jucab", "kucab", "lucab", "mucab", "nucab", "pucab", "rucab", "sucab",
    "tucab", "vucab", "wucab", "zucab", "badab", "cadab", "dadab", "fadab",
    "gadab", "hadab", "jadab", "kadab", "ladab", "madab", "nadab", "padab",
    "radab", "sadab", "tadab", "vadab", "wadab", "zadab", "bedab", "cedab",
    "dedab", "fedab", "gedab", "hedab", "jedab", "kedab", "ledab", "medab",
    "nedab", "pedab", "redab", "sedab", "tedab", "vedab", "wedab", "zedab",
    "bidab", "cidab", "didab", "fidab", "gidab", "hidab", "jidab", "kidab",
    "lidab", "midab", "nidab", "pidab", "ridab", "sidab", "tidab", "vidab",
    "widab", "zidab", "bodab", "codab", "dodab", "fodab", "godab", "hodab",
    "jodab", "kodab", "lodab", "modab", "nodab", "podab", "rodab", "sodab",
    "todab", "vodab", "wodab", "zodab", "budab", "cudab", "dudab", "fudab",
];
