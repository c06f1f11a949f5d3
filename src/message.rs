/// The Dom and Corwin IK+ crack intro text. `^Cs<d>;` switches the size
/// tier; the space runs keep size changes apart on screen.
pub const DEFAULT_MESSAGE: &str = concat!(
    "          THE UNION IS PROUD TO PRESENT YOU :                 ",
    "^Cs2;INTERNATIONAL KARATE PLUS     ",
    "^Cs0;CRACKED  BY                 ",
    "^Cs3;DOM AND CORWIN   ",
    "^Cs1;FROM THE         ",
    "^Cs3;REPLICANTS AND DMA   ",
    "^Cs1; PRESS F1-F5 AND SEE (IF YOU CAN !!!!) AND LIST..........    A SPECIAL HI",
    " TO WILD-XEROX OR RANK-COPPER MY MASTER!!!!!ARF.... HEEEUUUU JUST A LITTLE",
    " QUESTION : WHO HAVE         ",
    "^Cs2;BARBARIAN 2 ????????     ",
    "^Cs1;RRRRHHHHHAAAAAAAAAAA!!!!!! ANYBODY ????? I NEED BLOOD RRRHHAAAA!!!!! NEED",
    " HEAD !!!!! OOOUUUIIIINNNN I WEEP .. I CRY...... I RAVE , I'M DELIRIOUS I'M",
    " CAUGHT IN THE ACT-HANDED!!!!!!!         ",
    "^Cs0;OK KO I STOP, I RESET, I BREAK, I DRINK,I FLY, I CR...-CR... HIHIHI",
    " FINALLY I SAY :                 ",
    "^Cs3;SHEAT       ",
    "^Cs2;HEY HAVE-YOU CANAL PLUS??????????    WHAT ???????    I SAY CANAL PLUS   ",
    " BORDEL !! (IN FRENCH) YOU DON'T HAVE !!!! BUY THIS AND YOU WILL SEE MY MASTER",
    " : I NAME : RANK-COOPER ARF ARF HE TURN ONE'S BACK ON THE CAMERA   ",
    " OOOUUFF!!!HIHI GGGGGGGGGOOOOOOOOODDDDDDDDD     ",
    "^Cs1;IT'S ALL FOR DAY......         ",
    "^Cs0;REMEMBER YOU BARBARIAN 2 AND CANAL PLUS AND MY MASTER OF COURSE........ HI",
    " TO : ALL MEMBERS OF DMA(ESPECIALLY LOCKBUSTER FOR ORIGINAL), DELTA FORCE, TEX,",
    " BLADE RUNNERS, CHON-CHON, ALDO, ST-CONNEXION, THE HOBBIT BROTHERS, ABC 85, THE",
    " BARBARIANS.......                 ",
    "^Cs0;              ",
);
