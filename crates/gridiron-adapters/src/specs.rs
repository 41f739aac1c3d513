//! Page locations and `data-stat` field maps for every PFR table stat.

use crate::handler::{date, int, name, real, text, week, FieldSpec, TableSpec};
use crate::pfr::TableSelection;

const TEAM_IDENTITY: &[FieldSpec] = &[name("team", "team"), int("rank", "ranker"), int("games", "g")];

const TEAM_TOTALS: &[FieldSpec] = &[
    int("points", "points"),
    int("total_yards", "total_yds"),
    int("plays", "plays"),
    real("yards_per_play", "yds_per_play"),
    int("turnovers", "turnovers"),
    int("fumbles_lost", "fumbles_lost"),
    int("first_downs", "first_down"),
    int("pass_cmp", "pass_cmp"),
    int("pass_att", "pass_att"),
    int("pass_yards", "pass_yds"),
    int("pass_td", "pass_td"),
    int("pass_int", "pass_int"),
    real("pass_net_yards_per_att", "pass_net_yds_per_att"),
    int("rush_att", "rush_att"),
    int("rush_yards", "rush_yds"),
    int("rush_td", "rush_td"),
    real("rush_yards_per_att", "rush_yds_per_att"),
    int("penalties", "penalties"),
    int("penalty_yards", "penalties_yds"),
    real("score_pct", "score_pct"),
    real("turnover_pct", "turnover_pct"),
];

pub const TEAM_OFFENSE: TableSpec = TableSpec {
    page: "",
    tables: TableSelection::FirstOf(&["team_stats"]),
    fields: &[
        TEAM_IDENTITY,
        TEAM_TOTALS,
        &[real("expected_points", "exp_pts_tot")],
    ],
    required: &[],
};

pub const TEAM_DEFENSE: TableSpec = TableSpec {
    page: "",
    tables: TableSelection::FirstOf(&["opp_stats"]),
    fields: &[
        TEAM_IDENTITY,
        TEAM_TOTALS,
        &[real("expected_points", "exp_pts_def")],
    ],
    required: &[],
};

pub const STANDINGS: TableSpec = TableSpec {
    page: "",
    tables: TableSelection::AllOf(&["AFC", "NFC"]),
    fields: &[&[
        name("team", "team"),
        int("wins", "wins"),
        int("losses", "losses"),
        int("ties", "ties"),
        real("win_pct", "win_loss_perc"),
        int("points_for", "points"),
        int("points_against", "points_opp"),
        int("point_diff", "points_diff"),
        real("margin_of_victory", "mov"),
        real("strength_of_schedule", "sos_total"),
        real("srs", "srs_total"),
        real("offense_srs", "srs_offense"),
        real("defense_srs", "srs_defense"),
    ]],
    required: &[],
};

pub const TEAM_KICKING: TableSpec = TableSpec {
    page: "kicking.htm",
    tables: TableSelection::FirstOf(&["team_kicking", "team_stats"]),
    fields: &[
        TEAM_IDENTITY,
        &[
            int("fga", "fga"),
            int("fgm", "fgm"),
            int("fga_50_plus", "fga5"),
            int("fgm_50_plus", "fgm5"),
            int("fg_long", "fg_long"),
            real("fg_pct", "fg_perc"),
            int("xpa", "xpa"),
            int("xpm", "xpm"),
            real("xp_pct", "xp_perc"),
            int("kickoffs", "kickoffs"),
            int("kickoff_yards", "kickoff_yds"),
            int("touchbacks", "touchbacks"),
            real("touchback_pct", "tb_perc"),
            real("kickoff_avg", "kickoff_avg"),
        ],
    ],
    required: &[],
};

pub const TEAM_PUNTING: TableSpec = TableSpec {
    page: "punting.htm",
    tables: TableSelection::FirstOf(&["team_punting", "team_stats"]),
    fields: &[
        TEAM_IDENTITY,
        &[
            int("punts", "punt"),
            int("punt_yards", "punt_yds"),
            real("yards_per_punt", "punt_yds_per_punt"),
            int("return_yards", "punt_ret_yds"),
            int("net_yards", "punt_net_yds"),
            real("net_yards_per_punt", "punt_net_yds_per_punt"),
            int("long", "punt_long"),
            int("touchbacks", "punt_touchback"),
            real("touchback_pct", "punt_touchback_perc"),
            int("inside_20", "punt_inside_20"),
            real("inside_20_pct", "punt_inside_20_perc"),
            int("blocked", "punt_blocked"),
        ],
    ],
    required: &[],
};

pub const TEAM_RETURNS: TableSpec = TableSpec {
    page: "returns.htm",
    tables: TableSelection::FirstOf(&["team_returns", "team_stats"]),
    fields: &[
        TEAM_IDENTITY,
        &[
            int("punt_returns", "punt_ret"),
            int("punt_return_yards", "punt_ret_yds"),
            int("punt_return_td", "punt_ret_td"),
            int("punt_return_long", "punt_ret_long"),
            real("punt_return_avg", "punt_ret_yds_per_ret"),
            int("kick_returns", "kick_ret"),
            int("kick_return_yards", "kick_ret_yds"),
            int("kick_return_td", "kick_ret_td"),
            int("kick_return_long", "kick_ret_long"),
            real("kick_return_avg", "kick_ret_yds_per_ret"),
            int("all_purpose_yards", "all_purpose_yds"),
        ],
    ],
    required: &[],
};

const PLAYER_IDENTITY: &[FieldSpec] = &[
    name("team", "team"),
    name("player", "player"),
    int("rank", "ranker"),
    int("age", "age"),
    text("position", "pos"),
    int("games", "g"),
    int("games_started", "gs"),
];

pub const PASSING: TableSpec = TableSpec {
    page: "passing.htm",
    tables: TableSelection::FirstOf(&["passing"]),
    fields: &[
        PLAYER_IDENTITY,
        &[
            text("qb_record", "qb_rec"),
            int("completions", "pass_cmp"),
            int("attempts", "pass_att"),
            real("completion_pct", "pass_cmp_perc"),
            int("yards", "pass_yds"),
            int("td", "pass_td"),
            int("interceptions", "pass_int"),
            int("first_downs", "pass_first_down"),
            int("long", "pass_long"),
            real("yards_per_att", "pass_yds_per_att"),
            real("adj_yards_per_att", "pass_adj_yds_per_att"),
            real("yards_per_game", "pass_yds_per_g"),
            real("rating", "pass_rating"),
            real("qbr", "qbr"),
            int("sacks", "pass_sacked"),
            int("sack_yards", "pass_sacked_yds"),
        ],
    ],
    required: &[],
};

pub const RUSHING: TableSpec = TableSpec {
    page: "rushing.htm",
    tables: TableSelection::FirstOf(&["rushing"]),
    fields: &[
        PLAYER_IDENTITY,
        &[
            int("attempts", "rush_att"),
            int("yards", "rush_yds"),
            int("td", "rush_td"),
            int("first_downs", "rush_first_down"),
            int("long", "rush_long"),
            real("yards_per_att", "rush_yds_per_att"),
            real("yards_per_game", "rush_yds_per_g"),
            int("fumbles", "fumbles"),
        ],
    ],
    required: &[],
};

pub const RECEIVING: TableSpec = TableSpec {
    page: "receiving.htm",
    tables: TableSelection::FirstOf(&["receiving"]),
    fields: &[
        PLAYER_IDENTITY,
        &[
            int("targets", "targets"),
            int("receptions", "rec"),
            int("yards", "rec_yds"),
            real("yards_per_rec", "rec_yds_per_rec"),
            int("td", "rec_td"),
            int("first_downs", "rec_first_down"),
            int("long", "rec_long"),
            real("catch_pct", "catch_pct"),
            real("yards_per_target", "rec_yds_per_tgt"),
            int("fumbles", "fumbles"),
        ],
    ],
    required: &[],
};

pub const DEFENSE: TableSpec = TableSpec {
    page: "defense.htm",
    tables: TableSelection::FirstOf(&["defense"]),
    fields: &[
        PLAYER_IDENTITY,
        &[
            int("interceptions", "def_int"),
            int("int_yards", "def_int_yds"),
            int("int_td", "def_int_td"),
            int("passes_defended", "pass_defended"),
            int("forced_fumbles", "fumbles_forced"),
            int("fumble_recoveries", "fumbles_rec"),
            real("sacks", "sacks"),
            int("tackles_combined", "tackles_combined"),
            int("tackles_solo", "tackles_solo"),
            int("tackles_assists", "tackles_assists"),
            int("tackles_for_loss", "tackles_loss"),
            int("qb_hits", "qb_hits"),
            int("safeties", "safety_md"),
        ],
    ],
    required: &[],
};

pub const KICKING: TableSpec = TableSpec {
    page: "kicking.htm",
    tables: TableSelection::FirstOf(&["kicking"]),
    fields: &[
        PLAYER_IDENTITY,
        &[
            int("fga", "fga"),
            int("fgm", "fgm"),
            int("fg_long", "fg_long"),
            real("fg_pct", "fg_perc"),
            int("xpa", "xpa"),
            int("xpm", "xpm"),
            real("xp_pct", "xp_perc"),
            int("kickoffs", "kickoffs"),
            int("touchbacks", "touchbacks"),
        ],
    ],
    required: &[],
};

pub const PUNTING: TableSpec = TableSpec {
    page: "punting.htm",
    tables: TableSelection::FirstOf(&["punting"]),
    fields: &[
        PLAYER_IDENTITY,
        &[
            int("punts", "punt"),
            int("punt_yards", "punt_yds"),
            real("yards_per_punt", "punt_yds_per_punt"),
            real("net_yards_per_punt", "punt_net_yds_per_punt"),
            int("long", "punt_long"),
            int("inside_20", "punt_inside_20"),
            int("touchbacks", "punt_touchback"),
            int("blocked", "punt_blocked"),
        ],
    ],
    required: &[],
};

pub const RETURNS: TableSpec = TableSpec {
    page: "returns.htm",
    tables: TableSelection::FirstOf(&["returns"]),
    fields: &[
        PLAYER_IDENTITY,
        &[
            int("punt_returns", "punt_ret"),
            int("punt_return_yards", "punt_ret_yds"),
            int("punt_return_td", "punt_ret_td"),
            int("kick_returns", "kick_ret"),
            int("kick_return_yards", "kick_ret_yds"),
            int("kick_return_td", "kick_ret_td"),
            int("all_purpose_yards", "all_purpose_yds"),
        ],
    ],
    required: &[],
};

pub const SCORING: TableSpec = TableSpec {
    page: "scoring.htm",
    tables: TableSelection::FirstOf(&["scoring"]),
    fields: &[
        PLAYER_IDENTITY,
        &[
            int("rush_td", "rush_td"),
            int("rec_td", "rec_td"),
            int("punt_return_td", "punt_ret_td"),
            int("kick_return_td", "kick_ret_td"),
            int("all_td", "all_td"),
            int("two_point", "two_pt_md"),
            int("xpm", "xpm"),
            int("fgm", "fgm"),
            int("safeties", "safety_md"),
            int("points", "points"),
            real("points_per_game", "pts_per_g"),
        ],
    ],
    required: &[],
};

/// Games are keyed on the winner; unplayed games have no loser yet.
pub const GAMES: TableSpec = TableSpec {
    page: "games.htm",
    tables: TableSelection::FirstOf(&["games"]),
    fields: &[&[
        week("week", "week_num"),
        name("team", "winner"),
        name("opponent", "loser"),
        text("location", "game_location"),
        text("game_day", "game_day_of_week"),
        date("game_date", "game_date"),
        text("kickoff_time", "gametime"),
        int("team_points", "pts_win"),
        int("opponent_points", "pts_lose"),
        int("team_yards", "yards_win"),
        int("team_turnovers", "to_win"),
        int("opponent_yards", "yards_lose"),
        int("opponent_turnovers", "to_lose"),
    ]],
    required: &["opponent"],
};

/// Weekly page `week_{n}_injuries.htm`; the week and report date cells are
/// stamped on by the weekly handler.
pub const INJURIES: TableSpec = TableSpec {
    page: "injuries.htm",
    tables: TableSelection::FirstOf(&["injuries"]),
    fields: &[&[
        week("week", "week_num"),
        name("player", "player"),
        name("team", "team"),
        text("position", "pos"),
        text("injury_type", "injury"),
        text("designation", "game_status"),
        date("report_date", "report_date"),
    ]],
    required: &["designation"],
};
