//! Static menu and prompt content.
//!
//! Menus are plain data (`MenuId → text, buttons, media refs`); the dialog
//! controller only names a `MenuId` and the channel renders it. Buttons
//! carry their callback data as strings; parsing back into an [`Action`]
//! happens in `dialog::events`.

/// Identifier of a content menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuId {
    MainMenuNew,
    MainMenuRegistered,
    EventInfo,
    Venue,
    Schedule,
    AreaMap,
    LoftPlan,
    Confirmation,
    Faculty,
    InfoSource,
    PaymentSuccess,
    PaymentError,
}

/// One inline-keyboard button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    pub label: &'static str,
    pub callback: &'static str,
}

/// A menu: prompt text (may contain `{placeholders}`), buttons, media refs
/// relative to the media directory.
#[derive(Debug, Clone, Copy)]
pub struct Menu {
    pub text: &'static str,
    pub buttons: &'static [Button],
    pub media: &'static [&'static str],
}

// ── Prompts ─────────────────────────────────────────────────────────

pub const WELCOME: &str = "Проснись, {first_name}!\n\n\
    Пора готовиться к самой незабываемой ночёвке года. Собирай своих \
    друзей, доставай пижаму и готовься веселиться всю ночь напролёт!\n\n\
    Выбери информацию, которую желаешь узнать.";

pub const PAYMENT_INSTRUCTIONS: &str = "Ты можешь приобрести билет по одному из двух тарифов:\n\n\
    Power Nap: проход на мероприятие и напиток. Стоимость: 1200₽\n\n\
    Insomnia: проход на мероприятие, напиток и три коктейля на твой выбор. Стоимость: 1800₽\n\n\
    ВАЖНО: при покупке билета обязательно укажи ФИО и свой ВУЗ в сообщении к переводу.\n\n\
    ПОСЛЕ СОВЕРШЕНИЯ ОПЛАТЫ\n\n\
    Пожалуйста, напиши своё ФИО.\n\n\
    Пример: Иванов Иван Иванович";

pub const ENTER_NAME: &str = "Пожалуйста, напиши своё ФИО.\n\nПример: Иванов Иван Иванович";
pub const ENTER_UNIVERSITY: &str =
    "Напиши, из какого ты ВУЗа.\n\nЕсли ты не учишься в ВУЗе, напиши «Нигде».";
pub const INVALID_NAME: &str = "Пожалуйста, введите корректное ФИО.";
pub const INVALID_UNIVERSITY: &str = "Пожалуйста, введите корректное название ВУЗа.";
pub const UPDATE_DATA: &str = "Давайте обновим ваши данные. Пожалуйста, напишите своё ФИО.";
pub const RESTART: &str = "Произошла ошибка. Попробуйте заново /start";
pub const UNKNOWN_COMMAND: &str = "Неизвестная команда.";
pub const RECONCILE_HEADER: &str = "Схожести:";

// ── Option tables ───────────────────────────────────────────────────

/// Faculty menu keys and their stored labels.
pub const FACULTIES: &[(&str, &str)] = &[
    ("social_studies", "Социальные науки"),
    ("computer_studies", "Компьютерные науки"),
    ("human_studies", "Гуманитарные науки"),
    ("natural_studies", "Естественные науки"),
    ("physical_studies", "Физические науки"),
    ("another_studies", "Другое/не учусь в вузе"),
];

/// Info-source menu keys and their stored labels.
pub const INFO_SOURCES: &[(&str, &str)] = &[
    ("friends", "От друзей"),
    ("odnogroup", "От одногруппников/однокурсников"),
    ("social", "Из соцсетей"),
    ("posvat", "Пришел/а с посвята"),
    ("another", "Другое"),
];

pub fn faculty_label(key: &str) -> Option<&'static str> {
    FACULTIES.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

pub fn info_source_label(key: &str) -> Option<&'static str> {
    INFO_SOURCES.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

// ── Buttons ─────────────────────────────────────────────────────────

const BTN_MAIN: Button = Button {
    label: "Главное меню",
    callback: "menu_main",
};
const BTN_VENUE: Button = Button {
    label: "Место проведения",
    callback: "menu_venue",
};
const BTN_SCHEDULE: Button = Button {
    label: "Расписание",
    callback: "menu_schedule",
};
const BTN_MAP: Button = Button {
    label: "Карта местности",
    callback: "menu_map",
};
const BTN_LOFT: Button = Button {
    label: "План лофта",
    callback: "menu_loft",
};
const BTN_CHECK_PAYMENT: Button = Button {
    label: "Подтверждение оплаты",
    callback: "check_payment",
};
const BTN_EVENT_INFO: Button = Button {
    label: "Информация о мероприятии",
    callback: "event_info",
};

/// Extra button appended to the admin's main menu.
pub const RECONCILE_BUTTON: Button = Button {
    label: "Провести сверку",
    callback: "send_result",
};

// ── Menus ───────────────────────────────────────────────────────────

const MAIN_MENU_NEW: Menu = Menu {
    text: WELCOME,
    buttons: &[
        Button {
            label: "Купить билет",
            callback: "buy_ticket",
        },
        BTN_CHECK_PAYMENT,
        BTN_EVENT_INFO,
    ],
    media: &[],
};

const MAIN_MENU_REGISTERED: Menu = Menu {
    text: WELCOME,
    buttons: &[
        Button {
            label: "Изменить данные",
            callback: "change_data",
        },
        BTN_CHECK_PAYMENT,
        BTN_EVENT_INFO,
    ],
    media: &[],
};

const EVENT_INFO: Menu = Menu {
    text: "Информация о мероприятии:",
    buttons: &[BTN_VENUE, BTN_SCHEDULE, BTN_MAP, BTN_LOFT, BTN_MAIN],
    media: &[],
};

const VENUE: Menu = Menu {
    text: "Место проведения мероприятия:",
    buttons: &[BTN_SCHEDULE, BTN_MAP, BTN_LOFT, BTN_MAIN],
    media: &["venue.jpg"],
};

const SCHEDULE: Menu = Menu {
    text: "Расписание мероприятия:",
    buttons: &[BTN_VENUE, BTN_MAP, BTN_LOFT, BTN_MAIN],
    media: &["timeline.png"],
};

const AREA_MAP: Menu = Menu {
    text: "Карта местности:",
    buttons: &[BTN_SCHEDULE, BTN_VENUE, BTN_LOFT, BTN_MAIN],
    media: &["map.jpg"],
};

const LOFT_PLAN: Menu = Menu {
    text: "План лофта:",
    buttons: &[BTN_VENUE, BTN_SCHEDULE, BTN_MAP, BTN_MAIN],
    media: &["loft.jpg", "rules.pdf"],
};

const CONFIRMATION: Menu = Menu {
    text: "Пожалуйста, проверьте введённые данные:\n\n\
        ФИО: {name}\nВУЗ: {university}\nФакультет: {faculty}\n\
        Источник информации: {info_source}\n\nВсё верно?",
    buttons: &[
        Button {
            label: "Да",
            callback: "confirm_yes",
        },
        Button {
            label: "Нет",
            callback: "confirm_no",
        },
    ],
    media: &[],
};

const FACULTY: Menu = Menu {
    text: "Выберите ваш факультет:",
    buttons: &[
        Button {
            label: "Социальные науки",
            callback: "faculty_social_studies",
        },
        Button {
            label: "Компьютерные науки",
            callback: "faculty_computer_studies",
        },
        Button {
            label: "Гуманитарные науки",
            callback: "faculty_human_studies",
        },
        Button {
            label: "Естественные науки",
            callback: "faculty_natural_studies",
        },
        Button {
            label: "Физические науки",
            callback: "faculty_physical_studies",
        },
        Button {
            label: "Другое/не учусь в вузе",
            callback: "faculty_another_studies",
        },
        BTN_MAIN,
    ],
    media: &[],
};

const INFO_SOURCE: Menu = Menu {
    text: "Откуда вы узнали о мероприятии?",
    buttons: &[
        Button {
            label: "От друзей",
            callback: "info_source_friends",
        },
        Button {
            label: "От одногруппников/однокурсников",
            callback: "info_source_odnogroup",
        },
        Button {
            label: "Из соцсетей",
            callback: "info_source_social",
        },
        Button {
            label: "Пришел/а с посвята",
            callback: "info_source_posvat",
        },
        Button {
            label: "Другое",
            callback: "info_source_another",
        },
    ],
    media: &[],
};

const PAYMENT_SUCCESS: Menu = Menu {
    text: "Поздравляем, твой билет оформлен! Ждём тебя на мероприятии — следи за обновлениями в нашем канале.",
    buttons: &[BTN_MAIN],
    media: &[],
};

const PAYMENT_ERROR: Menu = Menu {
    text: "Ой! Кажется, духи перехватили твою оплату. Пожалуйста, напиши организаторам.",
    buttons: &[BTN_MAIN],
    media: &[],
};

/// Look up a menu by id.
pub fn menu(id: MenuId) -> &'static Menu {
    match id {
        MenuId::MainMenuNew => &MAIN_MENU_NEW,
        MenuId::MainMenuRegistered => &MAIN_MENU_REGISTERED,
        MenuId::EventInfo => &EVENT_INFO,
        MenuId::Venue => &VENUE,
        MenuId::Schedule => &SCHEDULE,
        MenuId::AreaMap => &AREA_MAP,
        MenuId::LoftPlan => &LOFT_PLAN,
        MenuId::Confirmation => &CONFIRMATION,
        MenuId::Faculty => &FACULTY,
        MenuId::InfoSource => &INFO_SOURCE,
        MenuId::PaymentSuccess => &PAYMENT_SUCCESS,
        MenuId::PaymentError => &PAYMENT_ERROR,
    }
}

/// Substitute `{key}` placeholders in a template.
pub fn render(template: &str, substitutions: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in substitutions {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}
