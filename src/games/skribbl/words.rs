//! Built-in vocabulary for the drawing game.

/// Every word a drawer can be asked to draw.
pub const WORDS: &[&str] = &[
    // Animals
    "cat", "dog", "elephant", "giraffe", "lion", "tiger", "monkey", "kangaroo", "zebra", "whale",
    "octopus", "penguin", "bear", "rabbit", "snail",

    // Food and drink
    "apple", "banana", "pizza", "burger", "fries", "icecream", "cake", "cookie", "carrot", "bread",
    "sushi", "donut", "cheese", "egg", "popcorn",

    // Objects
    "book", "chair", "table", "phone", "key", "watch", "glasses", "camera", "bottle", "backpack",
    "umbrella", "mirror", "pencil", "lamp", "toothbrush",

    // Vehicles
    "car", "bus", "bicycle", "motorcycle", "airplane", "train", "truck", "scooter", "boat",
    "submarine", "helicopter", "rocket", "tram", "skateboard",

    // Nature
    "tree", "flower", "mountain", "volcano", "cloud", "rain", "snowman", "sun", "moon", "river",
    "leaf", "island", "cactus", "iceberg", "ocean",

    // Places
    "school", "castle", "beach", "park", "zoo", "farm", "hospital", "airport", "stadium", "library",
    "museum", "desert", "forest", "cave", "village",

    // Fantasy
    "dragon", "robot", "alien", "wizard", "witch", "ghost", "vampire", "zombie", "mermaid",
    "knight", "fairy", "dinosaur", "spaceship", "treasure", "pirate", "monster", "ninja", "genie",
    "yeti", "kraken", "phoenix", "minotaur", "mummy", "centaur", "pegasus", "goblin", "leviathan",

    // Clothing
    "hat", "shirt", "pants", "shoes", "gloves", "jacket", "socks", "scarf", "skirt", "belt", "tie",
    "helmet", "boots", "crown",

    // Odds and ends
    "toilet", "boomerang", "jellyfish", "slingshot", "broom", "shark", "snowball", "lava", "magnet",
    "beehive", "marshmallow", "accordion", "trophy", "cannon", "trapdoor", "bunker",
    "rollercoaster", "maze", "simmons", "joker", "steve",
];
