//! The clinic's intent rule table.
//!
//! Rules are evaluated top-down and the first category whose trigger phrase
//! occurs in the normalized input wins, so declaration order is part of the
//! table's meaning. "help", for instance, belongs to both `emergency` and
//! `petcare_tips`; the emergency reply is the one users get.

/// Reply attached to an intent category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Always the same answer.
    Single(&'static str),
    /// One of several equally weighted answers.
    Choice(&'static [&'static str]),
}

impl Reply {
    /// Every answer this reply can produce.
    pub fn candidates(&self) -> Vec<&'static str> {
        match *self {
            Reply::Single(text) => vec![text],
            Reply::Choice(options) => options.to_vec(),
        }
    }
}

/// A category of user questions and the canned reply for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentRule {
    pub category: &'static str,
    /// Lowercase phrases; any one occurring as a substring triggers the rule.
    pub triggers: &'static [&'static str],
    pub reply: Reply,
}

impl IntentRule {
    /// Whether any trigger occurs in `normalized` (already trimmed and lowercased).
    pub fn matches(&self, normalized: &str) -> bool {
        self.triggers
            .iter()
            .any(|trigger| normalized.contains(&trigger.to_lowercase()))
    }
}

/// Shown when no rule matches.
pub const FALLBACK_REPLY: &str = "I'm not sure I understand. You can ask about:\n\n• Grooming services\n• Veterinary consultations\n• Vaccinations\n• Deworming\n• Appointments\n• Pricing\n• Emergency services\n• Location and payments";

/// Banner inserted when a session switches into assisted mode.
pub const ASSISTED_GREETING: &str = "🤖 You are now in Automated Chat mode.\n\nYou can ask me about:\n\n• Pet grooming services\n• Veterinary consultations\n• Vaccination schedules\n• Deworming services\n• Booking appointments\n\nHow can I assist you today?";

/// The built-in rule table, in evaluation order.
pub fn default_rules() -> Vec<IntentRule> {
    DEFAULT_RULES.to_vec()
}

static DEFAULT_RULES: &[IntentRule] = &[
    IntentRule {
        category: "greeting",
        triggers: &[
            "hello",
            "hi",
            "hey",
            "good morning",
            "good afternoon",
            "good evening",
            "howdy",
        ],
        reply: Reply::Single(
            "Hello! How can I assist you today? Feel free to ask about our pet care services!",
        ),
    },
    IntentRule {
        category: "grooming",
        triggers: &[
            "grooming",
            "groom",
            "haircut",
            "bath",
            "nail trim",
            "nail cutting",
            "fur",
            "brush",
            "brushing",
            "style",
        ],
        reply: Reply::Choice(&[
            "Our grooming services include:\n• Full bath and blow dry\n• Breed-specific haircuts\n• Nail trimming\n• Ear cleaning\n• Teeth brushing\n• De-matting\n\nWould you like to book a grooming appointment?",
            "Our professional groomers are certified and experienced with all breeds. Basic grooming starts at ₱500. Would you like to know more about pricing or book an appointment?",
            "Regular grooming is essential for your pet's health and appearance. We recommend grooming every 4-8 weeks depending on your pet's breed and coat type.",
        ]),
    },
    IntentRule {
        category: "vaccination",
        triggers: &[
            "vaccine",
            "vaccination",
            "shot",
            "immunization",
            "booster",
            "shots",
        ],
        reply: Reply::Choice(&[
            "We offer comprehensive vaccination services including:\n• Core vaccines\n• Rabies shots\n• Bordetella\n• DHPP\n• FVRCP\n\nWould you like to schedule a vaccination appointment?",
            "Vaccination schedule depends on your pet's age:\n• Puppies: 6-8 weeks onwards\n• Kittens: 6-8 weeks onwards\n• Adult pets: Annual boosters\n\nDo you need help planning a vaccination schedule?",
            "Keeping vaccinations up to date is crucial for your pet's health. Our vets can review your pet's vaccination history and recommend appropriate shots.",
        ]),
    },
    IntentRule {
        category: "consultation",
        triggers: &[
            "consult",
            "consultation",
            "check up",
            "checkup",
            "vet",
            "veterinary",
            "doctor",
            "examine",
            "examination",
        ],
        reply: Reply::Choice(&[
            "Our veterinary consultations include:\n• Physical examination\n• Health assessment\n• Dietary advice\n• Behavior consultation\n\nWould you like to schedule an appointment?",
            "Regular check-ups are recommended every 6-12 months for healthy pets, and more frequently for seniors or pets with health conditions.",
            "Our experienced veterinarians can help with:\n• Preventive care\n• Disease diagnosis\n• Treatment plans\n• Health certificates\n• Travel requirements",
        ]),
    },
    IntentRule {
        category: "deworming",
        triggers: &[
            "deworm",
            "deworming",
            "worm",
            "parasites",
            "worming",
            "antiparasitic",
        ],
        reply: Reply::Choice(&[
            "Our deworming services protect your pet from:\n• Roundworms\n• Tapeworms\n• Hookworms\n• Other internal parasites\n\nWould you like to schedule a deworming treatment?",
            "Recommended deworming schedule:\n• Puppies/Kittens: Every 2 weeks until 12 weeks\n• Adults: Every 3-6 months\n• Outdoor pets may need more frequent treatment",
            "Signs your pet might need deworming:\n• Weight loss\n• Bloated belly\n• Changes in appetite\n• Visible worms\nShall we schedule a check-up?",
        ]),
    },
    IntentRule {
        category: "booking",
        triggers: &[
            "book",
            "appointment",
            "schedule",
            "reserve",
            "booking",
            "slot",
            "available",
        ],
        reply: Reply::Choice(&[
            "I can help you book an appointment. Please specify which service you need:\n• Grooming\n• Vaccination\n• Consultation\n• Deworming",
            "Our clinic hours are:\nMonday-Saturday: 8:00 AM - 5:00 PM\nSunday: 9:00 AM - 3:00 PM\nWhen would you like to schedule your visit?",
            "For appointments, we'll need:\n• Pet's name and age\n• Type of service\n• Preferred date and time\nWould you like to proceed with booking?",
        ]),
    },
    IntentRule {
        category: "pricing",
        triggers: &[
            "price",
            "cost",
            "fee",
            "charge",
            "how much",
            "rate",
            "pricing",
        ],
        reply: Reply::Choice(&[
            "Our service prices (may vary by pet size):\n• Basic Grooming: ₱500-1000\n• Consultation: ₱400-600\n• Vaccination: ₱800-1500\n• Deworming: ₱300-500",
            "We offer package deals for multiple services. Would you like to know more about our current promotions?",
            "Prices may vary based on:\n• Pet size and breed\n• Service complexity\n• Additional treatments needed\nWould you like a detailed quote for a specific service?",
        ]),
    },
    IntentRule {
        category: "emergency",
        triggers: &[
            "emergency",
            "urgent",
            "critical",
            "help",
            "sick",
            "injury",
            "injured",
            "bleeding",
            "accident",
        ],
        reply: Reply::Choice(&[
            "For pet emergencies, please call our hotline immediately: (123) 456-7890. We have 24/7 emergency services available.",
            "Common emergency signs:\n• Difficulty breathing\n• Severe bleeding\n• Collapse\n• Seizures\n• Severe pain\nPlease seek immediate veterinary care if you notice these signs.",
            "Our emergency service is available 24/7. For urgent cases, please proceed directly to our clinic or call our emergency number.",
        ]),
    },
    IntentRule {
        category: "location",
        triggers: &[
            "where",
            "location",
            "address",
            "directions",
            "find",
            "clinic",
            "shop",
        ],
        reply: Reply::Single(
            "We're located at: 123 Pet Care Street, Manila. Landmarks:\n• Near Central Mall\n• Opposite City Park\n• 5 minutes from Metro Station\n\nWould you like directions?",
        ),
    },
    IntentRule {
        category: "payment",
        triggers: &[
            "payment",
            "pay",
            "cash",
            "card",
            "gcash",
            "installment",
        ],
        reply: Reply::Single(
            "We accept various payment methods:\n• Cash\n• Credit/Debit Cards\n• GCash\n• PayMaya\n• Bank Transfer\n\nWe also offer installment plans for major treatments.",
        ),
    },
    IntentRule {
        category: "about",
        triggers: &[
            "about",
            "clinic info",
            "tell me about",
            "what is",
            "who are you",
            "company",
            "history",
            "background",
        ],
        reply: Reply::Choice(&[
            "Welcome to PetFurMe! We are a full-service veterinary clinic and pet grooming center established in 2023. Our mission is to provide the highest quality care for your beloved pets.\n\nOur facility features:\n• Modern medical equipment\n• Dedicated surgical suite\n• Grooming stations\n• Pet pharmacy\n• Recovery rooms",
            "PetFurMe is your one-stop pet care destination. We offer:\n• Veterinary Services\n• Professional Grooming\n• Vaccinations\n• Preventive Care\n• Emergency Services\n\nOur team includes licensed veterinarians and certified pet groomers.",
            "Our Mission:\nTo provide comprehensive, high-quality pet care services with compassion and professionalism.\n\nOur Vision:\nTo be the most trusted partner in maintaining the health and happiness of your pets.",
        ]),
    },
    IntentRule {
        category: "staff",
        triggers: &[
            "staff",
            "team",
            "doctors",
            "veterinarians",
            "groomers",
            "employees",
            "specialists",
        ],
        reply: Reply::Choice(&[
            "Our dedicated team includes:\n• Licensed Veterinarians\n• Certified Pet Groomers\n• Veterinary Technicians\n• Pet Care Specialists\n• Client Care Staff\n\nAll our staff undergo regular training to stay updated with the latest pet care practices.",
            "Meet our key team members:\n• Dr. Santos - Chief Veterinarian\n• Dr. Reyes - Surgery Specialist\n• Ms. Garcia - Head Groomer\n• Mr. Tan - Emergency Care Specialist\n\nWould you like to schedule an appointment with any of them?",
        ]),
    },
    IntentRule {
        category: "facilities",
        triggers: &[
            "facility",
            "facilities",
            "equipment",
            "clinic features",
            "amenities",
            "services available",
        ],
        reply: Reply::Single(
            "Our modern facility features:\n• State-of-the-art Medical Equipment\n• Digital X-ray & Laboratory\n• Surgical Suite\n• Isolation Ward\n• Recovery Rooms\n• Professional Grooming Stations\n• Pet Pharmacy\n• Comfortable Waiting Area\n\nWould you like a tour of our facility?",
        ),
    },
    IntentRule {
        category: "specialties",
        triggers: &[
            "specialty",
            "specialties",
            "special services",
            "expert",
            "expertise",
        ],
        reply: Reply::Single(
            "Our specialties include:\n• Preventive Care\n• Soft Tissue Surgery\n• Dental Care\n• Dermatology\n• Nutrition Counseling\n• Behavioral Medicine\n• Senior Pet Care\n• Emergency Medicine\n\nWould you like to know more about any specific service?",
        ),
    },
    IntentRule {
        category: "safety",
        triggers: &[
            "safety",
            "protocols",
            "covid",
            "sanitation",
            "clean",
            "hygiene",
        ],
        reply: Reply::Single(
            "We maintain strict safety and hygiene protocols:\n• Regular sanitization\n• Medical-grade cleaning\n• Personal protective equipment\n• Social distancing measures\n• Temperature checks\n• Limited capacity\n\nYour pet's safety is our top priority!",
        ),
    },
    IntentRule {
        category: "petcare_tips",
        triggers: &[
            "tips",
            "advice",
            "guide",
            "help",
            "care tips",
            "how to",
        ],
        reply: Reply::Choice(&[
            "Essential pet care tips:\n• Regular vet check-ups\n• Maintain vaccination schedule\n• Proper nutrition\n• Regular exercise\n• Dental care\n• Grooming routine\n\nNeed specific advice for your pet?",
            "Daily pet care basics:\n• Fresh water always available\n• Quality pet food\n• Regular exercise\n• Grooming & hygiene\n• Love and attention\n\nWould you like detailed guidance on any of these?",
            "Health warning signs to watch for:\n• Changes in appetite\n• Unusual behavior\n• Lethargy\n• Excessive thirst\n• Difficulty breathing\n\nContact us immediately if you notice these signs.",
        ]),
    },
    IntentRule {
        category: "insurance",
        triggers: &[
            "insurance",
            "coverage",
            "pet insurance",
            "health card",
            "payment plans",
        ],
        reply: Reply::Single(
            "We work with various pet insurance providers:\n• Pet Insurance Co.\n• PawSecure\n• VetCare Plus\n\nWe also offer:\n• Flexible payment plans\n• Senior pet discounts\n• Multiple pet discounts\n\nWould you like to know more about insurance options?",
        ),
    },
    IntentRule {
        category: "contact",
        triggers: &[
            "contact",
            "phone",
            "email",
            "call",
            "reach",
            "message",
            "social media",
            "facebook",
            "instagram",
            "messenger",
        ],
        reply: Reply::Choice(&[
            "You can reach us through:\n\n📞 Phone Numbers:\n• Main Line: (02) 8123-4567\n• Emergency: 0917-123-4567\n\n📧 Email:\n• General Inquiries: info@petfurme.com\n• Appointments: booking@petfurme.com\n\n💬 Social Media:\n• Facebook: @PetFurMePH\n• Instagram: @petfurme\n• Messenger: m.me/PetFurMePH",
            "Our Customer Service Hours:\n\n🕒 Regular Hours:\nMonday-Saturday: 8:00 AM - 5:00 PM\nSunday: 9:00 AM - 3:00 PM\n\n🚨 Emergency Line:\n24/7 Available at 0917-123-4567",
            "Ways to Book an Appointment:\n\n• Call: (02) 8123-4567\n• WhatsApp: 0917-123-4567\n• Online: www.petfurme.com/book\n• Facebook Messenger\n• Through this chat\n\nHow would you like to proceed?",
        ]),
    },
    IntentRule {
        category: "feedback",
        triggers: &[
            "feedback",
            "review",
            "complaint",
            "suggest",
            "recommendation",
            "improve",
        ],
        reply: Reply::Choice(&[
            "We value your feedback! You can share your experience:\n\n• Email: feedback@petfurme.com\n• Call: (02) 8123-4567\n• Leave a review on our Facebook page\n• Fill out our feedback form in the clinic\n\nYour input helps us improve our services!",
            "Have a suggestion or concern? Contact our Customer Care team:\n\n• Customer Care Hotline: (02) 8123-4567\n• Email: care@petfurme.com\n\nWe aim to respond within 24 hours.",
        ]),
    },
    IntentRule {
        category: "branches",
        triggers: &[
            "branch",
            "branches",
            "other locations",
            "near me",
            "nearest",
        ],
        reply: Reply::Single(
            "Our Branches:\n\n📍 Main Branch:\n123 Pet Care Street, Manila\n\n📍 North Branch:\nSM North EDSA, Quezon City\n\n📍 South Branch:\nAyala Malls South Park, Muntinlupa\n\n📍 East Branch:\nMarikina Heights, Marikina City\n\nAll branches are open during regular business hours. Would you like specific directions to any branch?",
        ),
    },
    IntentRule {
        category: "partnership",
        triggers: &[
            "partner",
            "partnership",
            "collaborate",
            "business",
            "affiliate",
        ],
        reply: Reply::Single(
            "For Business Partnerships:\n\n👥 Contact our Business Development Team:\n• Email: partnerships@petfurme.com\n• Phone: (02) 8123-4567\n\nWe collaborate with:\n• Pet Food Brands\n• Pet Accessory Suppliers\n• Veterinary Medicine Suppliers\n• Other Pet Care Services",
        ),
    },
];
